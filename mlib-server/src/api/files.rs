//! File listing, upload, editing and trash endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use mlib_common::access::{can_see_tag, can_view};
use mlib_common::db::FileRecord;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::auth::CurrentSession;
use super::views::{file_view, file_views, FileView};
use crate::db::files::{self, FileListFilter};
use crate::db::{favorites, tags};
use crate::ingest::{self, maintenance, UploadOptions, UploadedFile};
use crate::search::SortKey;
use crate::{ApiError, ApiResult, AppState};

/// Load a file the caller may see
///
/// Missing files are NotFound; trashed or private-without-grant are Forbidden.
pub(crate) async fn viewable_file(state: &AppState, current: &CurrentSession, id: i64) -> ApiResult<FileRecord> {
    let file = files::get_file(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("File {} not found", id)))?;
    if !can_view(&file, current.has_private_access()) {
        return Err(ApiError::Forbidden(format!("File {} is not accessible", id)));
    }
    Ok(file)
}

async fn single_view(state: &AppState, current: &CurrentSession, file: &FileRecord) -> ApiResult<FileView> {
    let favorite_ids = favorites::favorite_ids(&state.db, current.user_id()).await?;
    Ok(file_view(&state.db, file, current.has_private_access(), &favorite_ids).await?)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Substring over name, description and MIME type
    pub q: Option<String>,
    /// MIME type prefix
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    /// `1` restricts to favorites
    pub favorites: Option<String>,
    pub order: Option<String>,
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<FileView>>> {
    let only_favorites = matches!(params.favorites.as_deref(), Some("1") | Some("true"));
    let filter = FileListFilter {
        search: params.q,
        mime_prefix: params.mime_type,
        favorites_of: only_favorites.then(|| current.user_id()),
        include_private: current.has_private_access(),
        private_only: false,
        order: SortKey::parse(params.order.as_deref()),
    };

    let found = files::list_files(&state.db, &filter).await?;
    let views = file_views(&state.db, &found, current.user_id(), current.has_private_access()).await?;
    Ok(Json(views))
}

/// GET /api/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<FileView>>> {
    let filter = FileListFilter {
        favorites_of: Some(current.user_id()),
        include_private: current.has_private_access(),
        ..FileListFilter::default()
    };

    let found = files::list_files(&state.db, &filter).await?;
    let views = file_views(&state.db, &found, current.user_id(), current.has_private_access()).await?;
    Ok(Json(views))
}

/// GET /api/files/:id
pub async fn get_file(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FileView>> {
    let file = viewable_file(&state, &current, id).await?;
    Ok(Json(single_view(&state, &current, &file).await?))
}

fn form_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "on" | "yes")
}

/// POST /api/files (multipart)
///
/// Fields: `files` (repeated), `convertToPdf`, `convertToAudio`, `private`,
/// `tags` and `privateTags` (comma separated).
pub async fn upload_files(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut uploads = Vec::new();
    let mut options = UploadOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                // Browsers send an empty part when no file was chosen
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                uploads.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field {}: {}", other, e)))?;
                match other {
                    "convertToPdf" => options.convert_to_pdf = form_flag(&value),
                    "convertToAudio" => options.convert_to_audio = form_flag(&value),
                    "private" => options.is_private = form_flag(&value),
                    "tags" => options.tags = tags::parse_tag_list(&value),
                    "privateTags" => options.private_tags = tags::parse_tag_list(&value),
                    _ => {}
                }
            }
        }
    }

    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }
    if (options.is_private || !options.private_tags.is_empty()) && !current.has_private_access() {
        return Err(ApiError::Forbidden("Private zone is locked".to_string()));
    }

    // Each file commits on its own; a failure leaves earlier files stored
    let mut stored: Vec<FileRecord> = Vec::new();
    for upload in uploads {
        let outcome = ingest::ingest_upload(&state.db, &state.layout, &state.converter, upload, &options).await?;
        stored.push(outcome.file);
        stored.extend(outcome.derived);
    }

    let views = file_views(&state.db, &stored, current.user_id(), current.has_private_access()).await?;
    let count = views.len();
    Ok((
        StatusCode::CREATED,
        Json(json!({ "uploaded": views, "count": count })),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoriteRequest {
    /// Explicit state; toggles when absent
    pub favorite: Option<bool>,
}

/// POST /api/files/:id/favorite
pub async fn set_favorite(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    body: Option<Json<FavoriteRequest>>,
) -> ApiResult<Json<serde_json::Value>> {
    let file = viewable_file(&state, &current, id).await?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let desired = match request.favorite {
        Some(explicit) => explicit,
        None => !favorites::is_favorite(&state.db, current.user_id(), file.id).await?,
    };
    favorites::set_favorite(&state.db, current.user_id(), file.id, desired).await?;

    Ok(Json(json!({ "id": file.id, "favorite": desired })))
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    #[serde(default)]
    pub description: String,
}

/// PUT /api/files/:id/description
///
/// Editing descriptions is reserved to callers with the private-zone grant.
pub async fn edit_description(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<DescriptionRequest>,
) -> ApiResult<Json<FileView>> {
    current.require_private_access()?;
    let file = viewable_file(&state, &current, id).await?;

    files::set_description(&state.db, file.id, &request.description).await?;
    let file = files::require_file(&state.db, file.id).await?;
    Ok(Json(single_view(&state, &current, &file).await?))
}

#[derive(Debug, Deserialize)]
pub struct TagRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TagEditRequest {
    /// Names to attach, created if missing
    pub add: Vec<String>,
    /// Create missing tags from `add` as private
    pub private: bool,
    pub rename: Vec<TagRename>,
    pub remove: Vec<String>,
}

/// POST /api/files/:id/tags
pub async fn edit_tags(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<TagEditRequest>,
) -> ApiResult<Json<FileView>> {
    let file = viewable_file(&state, &current, id).await?;
    let access = current.has_private_access();
    if request.private && !access {
        return Err(ApiError::Forbidden("Private zone is locked".to_string()));
    }

    let add: Vec<String> = request
        .add
        .iter()
        .map(|n| tags::normalize_tag_name(n))
        .filter(|n| !n.is_empty())
        .collect();
    tags::attach_names(&state.db, file.id, &add, request.private).await?;

    for rename in &request.rename {
        ensure_tag_visible(&state, &rename.from, access).await?;
        tags::rename_on_file(&state.db, file.id, &rename.from, &rename.to).await?;
    }

    for name in &request.remove {
        ensure_tag_visible(&state, name, access).await?;
        tags::remove_from_file(&state.db, file.id, name).await?;
    }

    info!(file_id = file.id, added = add.len(), renamed = request.rename.len(), removed = request.remove.len(), "Edited tags");
    Ok(Json(single_view(&state, &current, &file).await?))
}

/// Private tags are reported as missing to callers without the grant
async fn ensure_tag_visible(state: &AppState, name: &str, has_private_access: bool) -> ApiResult<()> {
    match tags::find_by_name(&state.db, name).await? {
        Some(tag) if !can_see_tag(&tag, has_private_access) => {
            Err(ApiError::NotFound(format!("Tag '{}' not found", name)))
        }
        _ => Ok(()),
    }
}

/// DELETE /api/files/:id
///
/// Moves the file to the trash.
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let file = files::require_file(&state.db, id).await?;
    // Privacy is checked before trash state
    if file.is_private && !current.has_private_access() {
        return Err(ApiError::Forbidden(format!("File {} is not accessible", id)));
    }
    if file.is_deleted() {
        return Err(ApiError::BadRequest(format!("File {} is already in the trash", id)));
    }

    files::soft_delete(&state.db, file.id, Utc::now()).await?;
    info!(file_id = file.id, name = %file.name, user_id = current.user_id(), "Moved file to trash");

    Ok(Json(json!({
        "id": file.id,
        "deleted": true,
        "retentionDays": state.config.trash_retention_days,
    })))
}

/// GET /api/trash
pub async fn list_trash(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<FileView>>> {
    let trashed = files::list_trash(&state.db, current.has_private_access()).await?;
    let views = file_views(&state.db, &trashed, current.user_id(), current.has_private_access()).await?;
    Ok(Json(views))
}

/// POST /api/trash/:id/restore
pub async fn restore_file(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FileView>> {
    let file = files::require_file(&state.db, id).await?;
    if file.is_private && !current.has_private_access() {
        return Err(ApiError::Forbidden(format!("File {} is not accessible", id)));
    }
    if !files::restore(&state.db, id).await? {
        return Err(ApiError::BadRequest(format!("File {} is not in the trash", id)));
    }
    info!(file_id = id, user_id = current.user_id(), "Restored file from trash");

    let file = files::require_file(&state.db, id).await?;
    Ok(Json(single_view(&state, &current, &file).await?))
}

/// POST /api/files/:id/convert
///
/// WMA audio becomes MP3; video becomes H.264/AAC MP4.
pub async fn convert_file(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FileView>> {
    let file = viewable_file(&state, &current, id).await?;
    let converted = maintenance::convert_in_place(&state.db, &state.converter, &file)
        .await
        .map_err(|e| {
            warn!(file_id = id, error = %e, "Conversion request failed");
            ApiError::from(e)
        })?;
    Ok(Json(single_view(&state, &current, &converted).await?))
}
