mod animation;
mod auth;
mod config;
mod error;
mod posts;
mod server;
#[cfg(test)]
mod testing;

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use animation::{CompletionSettings, ExtractionMode};
use auth::{FirebaseVerifier, IdentityVerifier};

#[derive(Deserialize)]
struct Environment {
    openai_api_key: Option<String>,
    firebase_api_key: Option<String>,
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "onomation",
    about = "Serve animations generated from Japanese onomatopoeia"
)]
struct Args {
    /// Address to listen on
    #[structopt(short, long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Path to the SQLite database holding posts
    #[structopt(short, long, default_value = "onomation.db")]
    database: PathBuf,

    /// Path to an optional TOML configuration file
    #[structopt(short = "c", long)]
    config: Option<PathBuf>,

    /// Reply format requested from the model (delimited or structured)
    #[structopt(short = "m", long, default_value = "structured")]
    mode: ExtractionMode,

    /// Model identifier, overriding the config file and the mode default
    #[structopt(long)]
    model: Option<String>,

    /// Sampling temperature, overriding the config file and the mode default
    #[structopt(long)]
    temperature: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let environment = envy::from_env::<Environment>()?;
    let args = Args::from_args();
    let config = config::Config::load(args.config.as_deref()).await?;

    let completion = CompletionSettings::resolve(
        args.mode,
        args.model,
        args.temperature,
        config.completion,
    );
    tracing::info!(
        mode = %completion.mode,
        model = %completion.model,
        temperature = completion.temperature,
        "completion settings"
    );
    if environment.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, generation requires a key in each request");
    }

    let client = reqwest::Client::new();

    let identity = match environment.firebase_api_key {
        Some(api_key) => IdentityVerifier::Firebase(FirebaseVerifier::new(
            client.clone(),
            config.identity.base_url,
            api_key,
        )),
        None => {
            tracing::warn!("FIREBASE_API_KEY not set, posts are accepted without identity tokens");
            IdentityVerifier::Disabled
        }
    };

    let posts = posts::PostStore::open(&args.database)?;
    tracing::info!(database = %args.database.display(), "opened post store");

    let state = server::AppState {
        client,
        completion,
        api_key: environment.openai_api_key,
        posts,
        identity,
    };

    let app = server::router(state, &config.cors.origins)?;
    server::run(app, args.bind).await
}
