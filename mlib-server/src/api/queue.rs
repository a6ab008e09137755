//! Ad-hoc queue endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::json;

use super::auth::CurrentSession;
use super::files::viewable_file;
use super::views::{file_views, visible_file_views, FileView};
use crate::{ApiResult, AppState};

/// GET /api/queue
///
/// Items the caller can no longer see are left out of the listing.
pub async fn list_queue(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    let items: Vec<FileView> = visible_file_views(
        &state.db,
        current.session.queue.items(),
        current.user_id(),
        current.has_private_access(),
    )
    .await?;

    Ok(Json(json!({
        "items": items,
        "count": current.session.queue.len(),
    })))
}

/// POST /api/queue/:file_id
pub async fn append(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
    Path(file_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let file = viewable_file(&state, &current, file_id).await?;
    let queued = current.session.queue.append(file.id);
    let count = current.session.queue.len();
    current.save(&state).await;

    Ok(Json(json!({ "queued": queued, "count": count })))
}

/// DELETE /api/queue/:file_id
pub async fn remove(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
    Path(file_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = current.session.queue.remove(file_id);
    let count = current.session.queue.len();
    current.save(&state).await;

    Ok(Json(json!({ "removed": removed, "count": count })))
}

/// POST /api/queue/clear
pub async fn clear_queue(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
) -> ApiResult<Json<serde_json::Value>> {
    current.session.queue.clear();
    current.save(&state).await;
    Ok(Json(json!({ "count": 0 })))
}

/// GET /api/queue/play/:position
pub async fn play_from(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(position): Path<usize>,
) -> ApiResult<Json<serde_json::Value>> {
    let (file_id, total) = current.session.queue.play_from(position)?;
    let item = viewable_file(&state, &current, file_id).await?;
    let view = file_views(
        &state.db,
        std::slice::from_ref(&item),
        current.user_id(),
        current.has_private_access(),
    )
    .await?
    .pop();

    Ok(Json(json!({
        "position": position,
        "total": total,
        "item": view,
    })))
}
