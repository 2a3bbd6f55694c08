//! HTTP routes for generation and the posts feed.

use anyhow::{Context, Result, bail};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION, header::CONTENT_TYPE};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::animation::{self, Animation, CompletionSettings};
use crate::auth::IdentityVerifier;
use crate::error::ApiError;
use crate::posts::{NewPost, Post, PostStore};

/// Everything handlers share, built once before the listener starts.
pub struct AppState {
    pub client: reqwest::Client,
    pub completion: CompletionSettings,
    /// Provider key from the environment; requests may bring their own.
    pub api_key: Option<String>,
    pub posts: PostStore,
    pub identity: IdentityVerifier,
}

type AppStateArc = Arc<AppState>;

#[derive(Deserialize)]
struct GenerateParams {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ListParams {
    uid: Option<String>,
}

pub fn router(state: AppState, origins: &[String]) -> Result<Router> {
    if origins.iter().any(|origin| origin == "*") {
        bail!("Wildcard CORS origin `*` cannot be combined with credentials");
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin `{origin}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Ok(Router::new()
        .route("/", get(hello))
        .route("/api/v1/gpt", post(generate))
        .route("/api/v1/posts", get(list_posts).post(create_post))
        .with_state(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn generate(
    State(state): State<AppStateArc>,
    Query(params): Query<GenerateParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Animation>, ApiError> {
    let api_key = generate_body(&headers, &body)?
        .and_then(|body| body.api_key)
        .filter(|key| !key.is_empty())
        .or_else(|| state.api_key.clone())
        .context("No OpenAI API key configured or supplied")?;

    tracing::info!(text = %params.text, "generating animation");

    let animation =
        animation::generate(&state.client, &state.completion, &api_key, &params.text).await?;

    Ok(Json(animation))
}

async fn create_post(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Json(post): Json<NewPost>,
) -> Result<Json<Post>, ApiError> {
    let token = bearer_token(&headers).or(post.id_token.as_deref());
    state.identity.authorize(token, &post.uid).await?;

    Ok(Json(state.posts.create(post)?))
}

async fn list_posts(
    State(state): State<AppStateArc>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = match params.uid {
        Some(uid) => state.posts.list_by_author(&uid)?,
        None => state.posts.list()?,
    };

    Ok(Json(posts))
}

/// The body is optional, but one that is sent must be a JSON `GenerateBody`.
fn generate_body(headers: &HeaderMap, body: &[u8]) -> Result<Option<GenerateBody>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return Err(ApiError::BadRequest(
            "Request body must be application/json".to_owned(),
        ));
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|error| ApiError::BadRequest(format!("Invalid request body: {error}")))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
