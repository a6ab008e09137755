//! Media bytes, gated by the access policy

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    response::{IntoResponse, Response},
    Extension,
};
use mime_guess::mime;
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use super::auth::CurrentSession;
use crate::db::files;
use crate::ingest::{thumbnail_path, THUMBNAIL_PREFIX};
use crate::{ApiError, ApiResult, AppState};

/// GET /media/:name
///
/// `thumb_<name>` serves the thumbnail of `<name>`. Trashed files are
/// reported missing; private files need the private-zone grant.
pub async fn serve_media(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(name): Path<String>,
    request: Request<Body>,
) -> ApiResult<Response> {
    let (record, thumbnail) = match files::find_by_name(&state.db, &name).await? {
        Some(record) => (Some(record), false),
        None => match name.strip_prefix(THUMBNAIL_PREFIX) {
            Some(original) => (files::find_by_name(&state.db, original).await?, true),
            None => (None, false),
        },
    };

    let file = match record {
        Some(file) if !file.is_deleted() => file,
        _ => return Err(ApiError::NotFound(format!("Media {} not found", name))),
    };
    if file.is_private && !current.has_private_access() {
        return Err(ApiError::Forbidden(format!("Media {} is not accessible", name)));
    }

    let source = PathBuf::from(&file.path);
    let path = if thumbnail { thumbnail_path(&source) } else { source };
    if !path.is_file() {
        return Err(ApiError::NotFound(format!("Media {} is missing from storage", name)));
    }
    debug!(file_id = file.id, thumbnail, path = %path.display(), "Serving media");

    let service = if thumbnail {
        ServeFile::new_with_mime(&path, &mime::IMAGE_JPEG)
    } else {
        ServeFile::new_with_mime(&path, &file.mime_type.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM))
    };

    let response = service
        .oneshot(request)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to serve {}: {}", name, e)))?;
    Ok(response.into_response())
}
