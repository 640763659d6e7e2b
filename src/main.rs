use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use petro_backoffice::config::AppConfig;
use petro_backoffice::service::BackofficeService;
use petro_backoffice::{http, logging};

#[derive(Parser, Debug)]
#[command(name = "petro-backoffice")]
#[command(version, about = "Petroleum depot back-office service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `server.bind`)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// sled database directory (overrides `storage.path`)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db) = args.db {
        config.storage.path = db;
    }

    logging::init(&config.log.level);

    let db = sled::open(&config.storage.path)
        .with_context(|| format!("opening database at {}", config.storage.path.display()))?;
    let service = Arc::new(BackofficeService::new(Arc::new(db)).context("opening stores")?);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!(addr = %config.server.bind, db = %config.storage.path.display(), "listening");

    axum::serve(listener, http::router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("shutting down");
    service.flush().context("flushing database")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
