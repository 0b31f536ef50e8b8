use clap::Parser;
use quill_core::{ConfigError, ConfigStore, PromptError, PromptRegistry};
use quill_server::{build_router, AppState};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "quill-server", version, about = "HTTP API for Quill")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Overrides `server.host`
    #[arg(long)]
    host: Option<String>,
    /// Overrides `server.port`
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load prompts: {0}")]
    Prompt(#[from] PromptError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();
    let store = ConfigStore::open(cli.config)?;
    let mut config = store.config().clone();
    if config.apply_key_from_env(|name| std::env::var(name).ok()) {
        log::info!("using API key from the environment");
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let prompts = PromptRegistry::from_prompt_config(&config.prompts)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, prompts);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
