//! Playlist playback transport, held in the caller's session

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use mlib_common::access::can_view;
use serde_json::json;
use tracing::{debug, info};

use super::auth::CurrentSession;
use super::playlists::{owned_playlist, visible_item_ids};
use super::views::file_view;
use crate::db::{favorites, files, playlists};
use crate::playback::PlaybackState;
use crate::{ApiError, ApiResult, AppState};

/// Serialize the session's playback state for the caller
async fn describe(state: &AppState, current: &CurrentSession) -> ApiResult<Json<serde_json::Value>> {
    let Some(playback) = current.session.playback.as_ref() else {
        return Ok(Json(json!({ "active": false })));
    };

    let playlist_name = playlists::get_playlist(&state.db, playback.playlist_id)
        .await?
        .map(|p| p.name);

    let current_item = match files::get_file(&state.db, playback.current).await? {
        Some(file) if can_view(&file, current.has_private_access()) => {
            let favorite_ids = favorites::favorite_ids(&state.db, current.user_id()).await?;
            Some(file_view(&state.db, &file, current.has_private_access(), &favorite_ids).await?)
        }
        _ => None,
    };

    Ok(Json(json!({
        "active": true,
        "playlistId": playback.playlist_id,
        "playlistName": playlist_name,
        "mode": playback.mode,
        "queue": playback.queue,
        "current": current_item,
    })))
}

fn active_playback(current: &mut CurrentSession) -> ApiResult<&mut PlaybackState> {
    current
        .session
        .playback
        .as_mut()
        .ok_or_else(|| ApiError::BadRequest("No playlist is playing".to_string()))
}

/// GET /api/player
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    describe(&state, &current).await
}

/// POST /api/player/start/:playlist_id
pub async fn start(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
    Path(playlist_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let playlist = owned_playlist(&state, &current, playlist_id).await?;
    let order = visible_item_ids(&state, playlist.id, current.has_private_access()).await?;

    let playback = PlaybackState::start(playlist.id, order)?;
    info!(playlist_id = playlist.id, items = playback.queue.len(), "Playback started");
    current.session.playback = Some(playback);

    let response = describe(&state, &current).await?;
    current.save(&state).await;
    Ok(response)
}

/// POST /api/player/next
pub async fn next(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    if !active_playback(&mut current)?.next() {
        debug!("Current item left the queue, next ignored");
    }
    let response = describe(&state, &current).await?;
    current.save(&state).await;
    Ok(response)
}

/// POST /api/player/previous
pub async fn previous(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    if !active_playback(&mut current)?.previous() {
        debug!("Current item left the queue, previous ignored");
    }
    let response = describe(&state, &current).await?;
    current.save(&state).await;
    Ok(response)
}

/// POST /api/player/shuffle
///
/// Turning shuffle off rebuilds the queue from the playlist as it is now.
pub async fn toggle_shuffle(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    let playlist_id = active_playback(&mut current)?.playlist_id;
    let live_order = visible_item_ids(&state, playlist_id, current.has_private_access()).await?;

    active_playback(&mut current)?.toggle_shuffle(live_order, &mut rand::thread_rng());

    let response = describe(&state, &current).await?;
    current.save(&state).await;
    Ok(response)
}
