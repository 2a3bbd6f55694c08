//! Post documents, stored one JSON document per row in SQLite.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::animation::Animation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub animation: Animation,
    pub comment: String,
    pub original_text: String,
    pub post_date: DateTime<FixedOffset>,
    pub uid: String,
    pub display_name: String,
    /// Identity token proving the writer is `uid`. Never stored.
    #[serde(default, skip_serializing)]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub animation: Animation,
    pub comment: String,
    pub original_text: String,
    pub post_date: DateTime<FixedOffset>,
    pub uid: String,
    pub display_name: String,
}

impl Post {
    fn from_new(id: String, post: NewPost) -> Self {
        Self {
            id,
            animation: post.animation,
            comment: post.comment,
            original_text: post.original_text,
            post_date: post.post_date,
            uid: post.uid,
            display_name: post.display_name,
        }
    }
}

#[derive(Clone)]
pub struct PostStore {
    conn: Arc<Mutex<Connection>>,
}

impl PostStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                post_date INTEGER NOT NULL,
                document TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_uid ON posts(uid);
            CREATE INDEX IF NOT EXISTS idx_posts_post_date ON posts(post_date);
            "#,
        )
        .context("Failed to initialize posts schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Post store connection lock poisoned"))
    }

    pub fn create(&self, post: NewPost) -> Result<Post> {
        let post = Post::from_new(uuid::Uuid::new_v4().to_string(), post);
        let document = serde_json::to_string(&post).context("Failed to serialize post")?;

        self.conn()?
            .execute(
                "INSERT INTO posts (id, uid, post_date, document) VALUES (?1, ?2, ?3, ?4)",
                params![post.id, post.uid, post.post_date.timestamp_millis(), document],
            )
            .context("Failed to insert post")?;

        tracing::info!(id = %post.id, uid = %post.uid, "stored post");

        Ok(post)
    }

    /// All posts, newest first.
    pub fn list(&self) -> Result<Vec<Post>> {
        self.query(
            "SELECT document FROM posts ORDER BY post_date DESC, rowid DESC",
            [],
        )
    }

    /// Posts written by `uid`, newest first.
    pub fn list_by_author(&self, uid: &str) -> Result<Vec<Post>> {
        self.query(
            "SELECT document FROM posts WHERE uid = ?1 ORDER BY post_date DESC, rowid DESC",
            params![uid],
        )
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let documents = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read posts")?;

        let posts = documents
            .iter()
            .map(|document| serde_json::from_str(document).context("Failed to parse stored post"))
            .collect::<Result<Vec<Post>>>()?;

        Ok(posts)
    }
}
