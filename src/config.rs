use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub cors: CorsConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    /// Falls back to the extraction mode's default model.
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub base_url: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            model: None,
            temperature: None,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: [
                "http://localhost:3000",
                "http://localhost",
                "https://onomation.yiwashita.com",
                "https://onomation.vercel.app",
            ]
            .map(str::to_owned)
            .to_vec(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "https://identitytoolkit.googleapis.com/v1".to_owned(),
        }
    }
}

impl Config {
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config TOML")
    }
}
