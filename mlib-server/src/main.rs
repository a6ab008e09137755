//! mlib-server - personal media library service
//!
//! Serves the JSON API, media bytes and the private zone over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mlib_common::config::{resolve_root_folder, ServiceConfig, StorageLayout};
use mlib_server::ingest::CommandConverter;
use mlib_server::AppState;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept from memory
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Command-line arguments for mlib-server
#[derive(Parser, Debug)]
#[command(name = "mlib-server")]
#[command(about = "Personal media library service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides mlib.toml)
    #[arg(short, long, env = "MLIB_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and uploads
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlib_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mlib-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_arg = args.root_folder.as_ref().map(|p| p.to_string_lossy().into_owned());
    let root_folder = resolve_root_folder(root_arg.as_deref());
    info!("Root folder: {}", root_folder.display());

    let mut config = ServiceConfig::load(&root_folder).context("Failed to load mlib.toml")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if !config.private_zone_enabled() {
        warn!("No private_passphrase configured; the private zone cannot be unlocked");
    }

    let layout = StorageLayout::new(root_folder);
    layout.ensure_dirs().context("Failed to create storage folders")?;

    let db_path = layout.database_path();
    info!("Database: {}", db_path.display());
    let pool = mlib_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config, layout, Arc::new(CommandConverter::new()));

    bootstrap_admin(&state).await?;
    spawn_session_sweeper(&state);

    let app = mlib_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the first administrator from `MLIB_ADMIN_USER` / `MLIB_ADMIN_PASSWORD`
async fn bootstrap_admin(state: &AppState) -> Result<()> {
    let (Ok(username), Ok(password)) = (
        std::env::var("MLIB_ADMIN_USER"),
        std::env::var("MLIB_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    let created = mlib_server::api::auth::ensure_admin_account(state, &username, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial administrator: {}", e))?;
    if !created {
        debug!("Accounts already exist, admin bootstrap skipped");
    }
    Ok(())
}

fn spawn_session_sweeper(state: &AppState) {
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                debug!(removed, "Swept expired sessions");
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
