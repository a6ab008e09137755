//! Trash purge
//!
//! Files soft-deleted longer than the retention window are removed from disk
//! (with their thumbnail) and from the database. A failure on one item is
//! logged and the purge moves on to the next.

use chrono::{DateTime, Duration, Utc};
use mlib_common::db::FileRecord;
use mlib_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{error, info, warn};

use crate::db::files;
use crate::ingest::thumbnail_path;

/// Outcome of a purge pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub processed: usize,
    pub purged: usize,
    pub failed: usize,
}

/// Purge every trashed file deleted more than `retention_days` before `now`
pub async fn purge_expired(pool: &SqlitePool, retention_days: i64, now: DateTime<Utc>) -> Result<PurgeReport> {
    let cutoff = now - Duration::days(retention_days);
    let expired = files::list_expired_trash(pool, cutoff).await?;

    let mut report = PurgeReport::default();
    for file in expired {
        report.processed += 1;
        match purge_file(pool, &file).await {
            Ok(()) => report.purged += 1,
            Err(e) => {
                error!(file_id = file.id, name = %file.name, error = %e, "Failed to purge file");
                report.failed += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        purged = report.purged,
        failed = report.failed,
        retention_days,
        "Trash purge finished"
    );
    Ok(report)
}

async fn purge_file(pool: &SqlitePool, file: &FileRecord) -> Result<()> {
    let path = Path::new(&file.path);
    if !remove_if_present(path).await? {
        warn!(file_id = file.id, path = %file.path, "Stored file already missing from disk");
    }
    remove_if_present(&thumbnail_path(path)).await?;

    files::hard_delete(pool, file.id).await?;
    info!(file_id = file.id, name = %file.name, "Purged file");
    Ok(())
}

/// Remove a file; returns false if it was already gone
async fn remove_if_present(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
