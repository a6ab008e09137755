//! mlib-purge - permanently delete files that stayed in the trash too long
//!
//! Meant to run from cron or a systemd timer. Failures on single files are
//! logged and counted; the exit status is non-zero only when the purge could
//! not run at all.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use mlib_common::config::{resolve_root_folder, ServiceConfig, StorageLayout};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mlib-purge")]
#[command(about = "Purge expired items from the mlib trash")]
#[command(version)]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Retention window in days (overrides mlib.toml)
    #[arg(long, env = "MLIB_TRASH_RETENTION_DAYS")]
    retention_days: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlib_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "mlib-purge v{} [{}] ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let root_arg = args.root_folder.as_ref().map(|p| p.to_string_lossy().into_owned());
    let root_folder = resolve_root_folder(root_arg.as_deref());

    let config = ServiceConfig::load(&root_folder).context("Failed to load mlib.toml")?;
    let retention_days = args.retention_days.unwrap_or(config.trash_retention_days);

    let layout = StorageLayout::new(root_folder);
    let pool = mlib_common::db::init_database(&layout.database_path())
        .await
        .context("Failed to open database")?;

    let report = mlib_server::trash::purge_expired(&pool, retention_days, Utc::now())
        .await
        .context("Trash purge failed")?;

    info!(
        processed = report.processed,
        purged = report.purged,
        failed = report.failed,
        "Done"
    );
    pool.close().await;
    Ok(())
}
