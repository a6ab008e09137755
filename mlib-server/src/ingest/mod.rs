//! Media Ingestion
//!
//! Stores uploaded bytes under a sanitized, unique name in the public or
//! private upload folder, records the file and runs the thumbnail and
//! conversion side effects. Conversion failures are logged and never fail
//! the upload.

pub mod converter;
pub mod maintenance;

pub use converter::{CodecReport, CommandConverter, ConversionError, MediaConverter};

use mlib_common::config::StorageLayout;
use mlib_common::db::FileRecord;
use mlib_common::Result;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::db::{files, tags};
use converter::{run_blocking, sibling_path};

/// Prefix of thumbnail files stored next to their source
pub const THUMBNAIL_PREFIX: &str = "thumb_";

/// Office formats accepted for PDF conversion
pub const CONVERTIBLE_DOCUMENTS: &[&str] = &["doc", "docx", "odt", "ppt", "pptx", "xls", "xlsx"];

/// One file received in an upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Content type declared by the client
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Flags and tags applying to every file of an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub is_private: bool,
    pub convert_to_pdf: bool,
    pub convert_to_audio: bool,
    pub tags: Vec<String>,
    /// Tags created private if they don't exist yet
    pub private_tags: Vec<String>,
}

/// Records created for one uploaded file
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub file: FileRecord,
    /// Converted siblings (PDF, extracted audio), recorded as their own items
    pub derived: Vec<FileRecord>,
}

/// Reduce an uploaded file name to a safe single path component
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`;
/// leading dots and underscores are stripped.
pub fn sanitize_filename(name: &str) -> String {
    // Browsers on Windows may send the full client path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// MIME type from the file name, then the declared type, then octet-stream
pub fn detect_mime(file_name: &str, declared: Option<&str>) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .or_else(|| {
            declared
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// SHA-256 of the content, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Thumbnail location for a stored file: `thumb_<name>` in the same folder
pub fn thumbnail_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", THUMBNAIL_PREFIX, name))
}

fn lowercase_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// True for office documents that can be converted to PDF
pub fn is_convertible_document(name: &str) -> bool {
    lowercase_extension(name).is_some_and(|ext| CONVERTIBLE_DOCUMENTS.contains(&ext.as_str()))
}

/// `<stem>_<n><.ext>`
pub fn numbered_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_{}{}", stem, n, extension)
}

/// Pick a name not used by any record or file in `dir`
///
/// Collisions get `_1`, `_2`, ... appended to the stem. A name also collides
/// when its thumbnail slot is in use, or when it is the thumbnail slot of a
/// stored file.
pub async fn unique_name(pool: &SqlitePool, dir: &Path, name: &str) -> Result<String> {
    let mut candidate = name.to_string();
    let mut counter = 1;
    while name_collides(pool, dir, &candidate).await? {
        candidate = numbered_name(name, counter);
        counter += 1;
    }
    Ok(candidate)
}

async fn name_collides(pool: &SqlitePool, dir: &Path, candidate: &str) -> Result<bool> {
    if slot_taken(pool, dir, candidate).await? {
        return Ok(true);
    }
    if slot_taken(pool, dir, &format!("{}{}", THUMBNAIL_PREFIX, candidate)).await? {
        return Ok(true);
    }
    match candidate.strip_prefix(THUMBNAIL_PREFIX) {
        Some(source) if !source.is_empty() => slot_taken(pool, dir, source).await,
        _ => Ok(false),
    }
}

async fn slot_taken(pool: &SqlitePool, dir: &Path, name: &str) -> Result<bool> {
    Ok(files::name_taken(pool, name).await? || dir.join(name).exists())
}

/// Unused destination in `dir` for converting `source` to `<stem><suffix>`
pub(crate) async fn conversion_destination(
    pool: &SqlitePool,
    dir: &Path,
    source: &Path,
    suffix: &str,
) -> Result<PathBuf> {
    let name = file_name_of(&sibling_path(source, dir, suffix));
    Ok(dir.join(unique_name(pool, dir, &name).await?))
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Generate the thumbnail for a stored file, logging failures
///
/// Returns true when a thumbnail was written.
pub async fn generate_thumbnail(converter: &Arc<dyn MediaConverter>, path: &Path, mime_type: &str) -> bool {
    if !(mime_type.starts_with("image/")
        || mime_type.starts_with("video/")
        || mime_type == "application/pdf")
    {
        return false;
    }

    let source = path.to_path_buf();
    let dest = thumbnail_path(path);
    let mime = mime_type.to_string();
    match run_blocking(converter, move |c| c.generate_thumbnail(&source, &mime, &dest)).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Thumbnail generation failed");
            false
        }
    }
}

/// Persist one uploaded file and run its side effects
pub async fn ingest_upload(
    pool: &SqlitePool,
    layout: &StorageLayout,
    converter: &Arc<dyn MediaConverter>,
    upload: UploadedFile,
    options: &UploadOptions,
) -> Result<IngestOutcome> {
    let dir = layout.upload_dir_for(options.is_private);
    tokio::fs::create_dir_all(&dir).await?;

    let name = unique_name(pool, &dir, &sanitize_filename(&upload.file_name)).await?;
    let path = dir.join(&name);
    let mut stored = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    stored.write_all(&upload.bytes).await?;
    stored.flush().await?;

    let mime_type = detect_mime(&name, upload.content_type.as_deref());
    generate_thumbnail(converter, &path, &mime_type).await;

    let file = files::insert_file(
        pool,
        &files::NewFile {
            name: name.clone(),
            path: path.to_string_lossy().into_owned(),
            mime_type: mime_type.clone(),
            size_bytes: upload.bytes.len() as i64,
            is_private: options.is_private,
            content_hash: Some(content_hash(&upload.bytes)),
        },
    )
    .await?;
    apply_upload_tags(pool, file.id, options).await?;

    info!(
        file_id = file.id,
        name = %file.name,
        mime = %file.mime_type,
        size = file.size_bytes,
        private = file.is_private,
        "Stored upload"
    );

    let mut derived = Vec::new();

    if options.convert_to_pdf && is_convertible_document(&name) {
        let dest = conversion_destination(pool, &dir, &path, ".pdf").await?;
        let (source, target) = (path.clone(), dest.clone());
        let result = run_blocking(converter, move |c| c.convert_document_to_pdf(&source, &target)).await;
        if let Some(record) = record_derived(pool, converter, result, &dest, options, "document to PDF").await? {
            derived.push(record);
        }
    }

    if options.convert_to_audio && mime_type.starts_with("video/") {
        let dest = conversion_destination(pool, &dir, &path, ".mp3").await?;
        let (source, target) = (path.clone(), dest.clone());
        let result = run_blocking(converter, move |c| c.extract_audio(&source, &target)).await;
        if let Some(record) = record_derived(pool, converter, result, &dest, options, "video to audio").await? {
            derived.push(record);
        }
    }

    Ok(IngestOutcome { file, derived })
}

async fn apply_upload_tags(pool: &SqlitePool, file_id: i64, options: &UploadOptions) -> Result<()> {
    // Tags on private uploads are private when first created
    tags::attach_names(pool, file_id, &options.tags, options.is_private).await?;
    tags::attach_names(pool, file_id, &options.private_tags, true).await?;
    Ok(())
}

/// Record a converted sibling file; conversion failures are logged and skipped
async fn record_derived(
    pool: &SqlitePool,
    converter: &Arc<dyn MediaConverter>,
    result: std::result::Result<(), ConversionError>,
    path: &Path,
    options: &UploadOptions,
    label: &str,
) -> Result<Option<FileRecord>> {
    if let Err(e) = result {
        warn!(conversion = label, path = %path.display(), error = %e, "Conversion failed");
        return Ok(None);
    }

    let name = file_name_of(path);
    let bytes = tokio::fs::read(path).await?;
    let mime_type = detect_mime(&name, None);
    generate_thumbnail(converter, path, &mime_type).await;

    let record = files::insert_file(
        pool,
        &files::NewFile {
            name,
            path: path.to_string_lossy().into_owned(),
            mime_type,
            size_bytes: bytes.len() as i64,
            is_private: options.is_private,
            content_hash: Some(content_hash(&bytes)),
        },
    )
    .await?;
    apply_upload_tags(pool, record.id, options).await?;

    info!(file_id = record.id, name = %record.name, conversion = label, "Recorded converted file");
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Holiday (1).jpg"), "My_Holiday_1.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\ana\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("ñ"), "file");
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_mime("a.jpg", None), "image/jpeg");
        assert_eq!(detect_mime("a.pdf", Some("text/plain")), "application/pdf");
        assert_eq!(detect_mime("noext", Some("audio/x-ms-wma")), "audio/x-ms-wma");
        assert_eq!(detect_mime("noext", None), "application/octet-stream");
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_thumbnail_path() {
        assert_eq!(
            thumbnail_path(Path::new("/srv/uploads/cat.png")),
            PathBuf::from("/srv/uploads/thumb_cat.png")
        );
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("cat.jpg", 2), "cat_2.jpg");
        assert_eq!(numbered_name("README", 1), "README_1");
    }

    #[test]
    fn test_convertible_documents() {
        assert!(is_convertible_document("report.DOCX"));
        assert!(!is_convertible_document("photo.jpg"));
        assert!(!is_convertible_document("README"));
    }
}
