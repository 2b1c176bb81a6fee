//! hemvip-api - perceptual-study backend service
//!
//! Serves study assignment, study content and study completion over HTTP,
//! backed by a SQLite store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hemvip_common::config::{load_config_file, Config, ConfigOverrides};
use hemvip_common::db::init_database;
use hemvip_api::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hemvip-api
#[derive(Parser, Debug)]
#[command(name = "hemvip-api")]
#[command(about = "Perceptual-study backend for HEMVIP")]
#[command(version)]
struct Args {
    /// Address to listen on (host:port)
    #[arg(short, long, env = "HEMVIP_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "HEMVIP_DB")]
    db: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "HEMVIP_CONFIG")]
    config: Option<PathBuf>,

    /// Allowed CORS origin (repeatable, or comma-separated in the env var)
    #[arg(long = "allowed-origin", env = "HEMVIP_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Select/claim rounds per assignment request
    #[arg(long, env = "HEMVIP_CLAIM_ATTEMPTS")]
    claim_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "HEMVIP_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind.clone(),
            db_path: self.db.clone(),
            allowed_origins: (!self.allowed_origins.is_empty()).then(|| self.allowed_origins.clone()),
            claim_attempts: self.claim_attempts,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hemvip_api=info,hemvip_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting hemvip-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let file = load_config_file(args.config.as_deref()).context("Failed to load config file")?;
    let config: Config = Config::resolve(args.overrides(), file).context("Invalid configuration")?;

    info!("Database path: {}", config.db_path.display());
    if config.allowed_origins.is_empty() {
        info!("No CORS origins configured; cross-origin requests will be refused");
    } else {
        info!("Allowed CORS origins: {}", config.allowed_origins.join(", "));
    }

    let pool = match init_database(&config.db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool.clone(), config.claim_attempts);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("hemvip-api listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
