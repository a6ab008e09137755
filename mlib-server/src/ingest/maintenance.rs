//! Thumbnail regeneration, in-place conversion and codec reports

use mlib_common::db::FileRecord;
use mlib_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::converter::{run_blocking, CodecReport, MediaConverter};
use super::{
    content_hash, conversion_destination, detect_mime, file_name_of, generate_thumbnail, thumbnail_path,
};
use crate::db::files;

/// Outcome of a thumbnail regeneration pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateReport {
    pub processed: usize,
    pub generated: usize,
    pub failed: usize,
    /// Files whose thumbnail slot belongs to another record
    pub name_conflicts: usize,
    /// Records whose stored file no longer exists
    pub missing_sources: usize,
}

/// Regenerate thumbnails for every non-trashed file
///
/// Without `force` only missing thumbnails are produced.
pub async fn regenerate_thumbnails(
    pool: &SqlitePool,
    converter: &Arc<dyn MediaConverter>,
    force: bool,
) -> Result<RegenerateReport> {
    let mut report = RegenerateReport::default();

    for file in files::list_active(pool).await? {
        let path = PathBuf::from(&file.path);
        if !path.exists() {
            warn!(file_id = file.id, path = %file.path, "Stored file missing, skipping thumbnail");
            report.missing_sources += 1;
            continue;
        }
        if !force && thumbnail_path(&path).exists() {
            continue;
        }
        if !has_thumbnail_kind(&file.mime_type) {
            continue;
        }
        let slot = file_name_of(&thumbnail_path(&path));
        if files::name_taken(pool, &slot).await? {
            warn!(file_id = file.id, slot = %slot, "Thumbnail slot holds another item, skipping");
            report.name_conflicts += 1;
            continue;
        }

        report.processed += 1;
        if generate_thumbnail(converter, &path, &file.mime_type).await {
            report.generated += 1;
        } else {
            report.failed += 1;
        }
    }

    info!(
        processed = report.processed,
        generated = report.generated,
        failed = report.failed,
        conflicts = report.name_conflicts,
        missing = report.missing_sources,
        "Thumbnail regeneration finished"
    );
    Ok(report)
}

fn has_thumbnail_kind(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type.starts_with("video/") || mime_type == "application/pdf"
}

fn is_wma(file: &FileRecord) -> bool {
    file.mime_type.starts_with("audio/") && file.name.to_lowercase().ends_with(".wma")
}

/// True when the file has an in-place conversion (WMA audio or any video)
pub fn can_convert(file: &FileRecord) -> bool {
    is_wma(file) || file.mime_type.starts_with("video/")
}

/// Convert a file in place: WMA to MP3, video to H.264/AAC MP4
///
/// The record is repointed at the converted file and the old file and its
/// thumbnail are removed. Tags, favorites and playlist entries are kept.
pub async fn convert_in_place(
    pool: &SqlitePool,
    converter: &Arc<dyn MediaConverter>,
    file: &FileRecord,
) -> Result<FileRecord> {
    if !can_convert(file) {
        return Err(Error::InvalidInput(format!(
            "No conversion available for {} ({})",
            file.name, file.mime_type
        )));
    }

    let source = PathBuf::from(&file.path);
    if !source.exists() {
        return Err(Error::NotFound(format!("Stored file missing: {}", file.path)));
    }
    let out_dir = source
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::Internal(format!("No parent folder for {}", file.path)))?;

    let wma = is_wma(file);
    let suffix = if wma { ".mp3" } else { "_compatible.mp4" };
    let converted = conversion_destination(pool, &out_dir, &source, suffix).await?;

    let (job_source, job_dest) = (source.clone(), converted.clone());
    run_blocking(converter, move |c| {
        if wma {
            c.convert_audio_to_mp3(&job_source, &job_dest)
        } else {
            c.transcode_compatible(&job_source, &job_dest)
        }
    })
    .await
    .map_err(|e| {
        warn!(file_id = file.id, error = %e, "In-place conversion failed");
        Error::Conversion(e.to_string())
    })?;

    let name = file_name_of(&converted);
    let bytes = tokio::fs::read(&converted).await?;
    let mime_type = detect_mime(&name, None);

    files::update_converted(
        pool,
        file.id,
        &name,
        &converted.to_string_lossy(),
        &mime_type,
        bytes.len() as i64,
        Some(&content_hash(&bytes)),
    )
    .await?;

    for stale in [source.clone(), thumbnail_path(&source)] {
        if let Err(e) = tokio::fs::remove_file(&stale).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %stale.display(), error = %e, "Failed to remove replaced file");
            }
        }
    }
    generate_thumbnail(converter, &converted, &mime_type).await;

    info!(file_id = file.id, from = %file.name, to = %name, "Converted file in place");
    files::require_file(pool, file.id).await
}

/// Codec report entry for one audio or video file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimediaEntry {
    pub file_id: i64,
    pub name: String,
    pub mime_type: String,
    pub codecs: Option<CodecReport>,
    pub error: Option<String>,
    pub convertible: bool,
}

/// Probe every public, non-trashed audio and video file
pub async fn multimedia_report(
    pool: &SqlitePool,
    converter: &Arc<dyn MediaConverter>,
) -> Result<Vec<MultimediaEntry>> {
    let mut entries = Vec::new();

    for file in files::list_active(pool).await? {
        if file.is_private
            || !(file.mime_type.starts_with("video/") || file.mime_type.starts_with("audio/"))
        {
            continue;
        }

        let path = PathBuf::from(&file.path);
        let (codecs, error) = match run_blocking(converter, move |c| c.probe_codecs(&path)).await {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e.to_string())),
        };

        entries.push(MultimediaEntry {
            file_id: file.id,
            convertible: can_convert(&file),
            name: file.name,
            mime_type: file.mime_type,
            codecs,
            error,
        });
    }

    Ok(entries)
}
