use anyhow::{Context, Result};
use clap::Parser;
use compass_voice::{create_router, AppState, Config, TranscriptStore};
use std::path::Path;
use tracing::info;

/// Live voice conversation service for the Compass career assistant
#[derive(Parser)]
#[command(name = "compass-voice", version)]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/compass-voice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let store = TranscriptStore::open(Path::new(&cfg.storage.data_dir))?;
    info!("transcript history: {} entries", store.len());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, store);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
