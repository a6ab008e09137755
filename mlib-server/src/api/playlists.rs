//! Playlist endpoints; playlists are private to their owner

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use mlib_common::access::can_view;
use mlib_common::db::Playlist;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::auth::CurrentSession;
use super::files::viewable_file;
use super::views::{playlist_view, PlaylistView};
use crate::db::{files, playlists};
use crate::{ApiError, ApiResult, AppState};

/// Load a playlist owned by the caller
pub(crate) async fn owned_playlist(state: &AppState, current: &CurrentSession, id: i64) -> ApiResult<Playlist> {
    let playlist = playlists::require_playlist(&state.db, id).await?;
    if playlist.owner_id != current.user_id() {
        return Err(ApiError::Forbidden(format!("Playlist {} belongs to another user", id)));
    }
    Ok(playlist)
}

/// Item ids of a playlist the caller may currently see, in playlist order
pub(crate) async fn visible_item_ids(
    state: &AppState,
    playlist_id: i64,
    has_private_access: bool,
) -> ApiResult<Vec<i64>> {
    let mut visible = Vec::new();
    for id in playlists::item_ids(&state.db, playlist_id).await? {
        if let Some(file) = files::get_file(&state.db, id).await? {
            if can_view(&file, has_private_access) {
                visible.push(id);
            }
        }
    }
    Ok(visible)
}

#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    #[serde(default)]
    pub name: String,
}

/// GET /api/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<PlaylistView>>> {
    let owned = playlists::list_for_owner(&state.db, current.user_id()).await?;
    let mut views = Vec::with_capacity(owned.len());
    for playlist in &owned {
        views.push(playlist_view(&state.db, playlist, current.has_private_access()).await?);
    }
    Ok(Json(views))
}

/// POST /api/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<PlaylistRequest>,
) -> ApiResult<impl IntoResponse> {
    let playlist = playlists::create_playlist(&state.db, current.user_id(), &request.name).await?;
    info!(playlist_id = playlist.id, name = %playlist.name, user_id = current.user_id(), "Created playlist");

    let view = playlist_view(&state.db, &playlist, current.has_private_access()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/playlists/:id
pub async fn get_playlist(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PlaylistView>> {
    let playlist = owned_playlist(&state, &current, id).await?;
    Ok(Json(playlist_view(&state.db, &playlist, current.has_private_access()).await?))
}

/// PUT /api/playlists/:id
pub async fn rename_playlist(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<PlaylistRequest>,
) -> ApiResult<Json<PlaylistView>> {
    owned_playlist(&state, &current, id).await?;
    playlists::rename_playlist(&state.db, id, &request.name).await?;

    let playlist = playlists::require_playlist(&state.db, id).await?;
    Ok(Json(playlist_view(&state.db, &playlist, current.has_private_access()).await?))
}

/// DELETE /api/playlists/:id
pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let playlist = owned_playlist(&state, &current, id).await?;
    playlists::delete_playlist(&state.db, playlist.id).await?;
    info!(playlist_id = id, user_id = current.user_id(), "Deleted playlist");

    Ok(Json(json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub file_id: i64,
}

/// POST /api/playlists/:id/items
///
/// Adding a file that is already in the playlist leaves it unchanged.
pub async fn add_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<Json<PlaylistView>> {
    let playlist = owned_playlist(&state, &current, id).await?;
    let file = viewable_file(&state, &current, request.file_id).await?;

    if playlists::add_item(&state.db, playlist.id, file.id).await? {
        info!(playlist_id = playlist.id, file_id = file.id, "Added item to playlist");
    }
    Ok(Json(playlist_view(&state.db, &playlist, current.has_private_access()).await?))
}

/// DELETE /api/playlists/:id/items/:file_id
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path((id, file_id)): Path<(i64, i64)>,
) -> ApiResult<Json<PlaylistView>> {
    let playlist = owned_playlist(&state, &current, id).await?;
    if !playlists::remove_item(&state.db, playlist.id, file_id).await? {
        return Err(ApiError::NotFound(format!(
            "File {} is not in playlist {}",
            file_id, playlist.id
        )));
    }
    Ok(Json(playlist_view(&state.db, &playlist, current.has_private_access()).await?))
}
