//! Notes: owner-managed text, optionally public or shared with other users

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use mlib_common::access::can_view_note;
use mlib_common::db::Note;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::auth::CurrentSession;
use super::views::NoteView;
use crate::db::notes::{self, NoteInput};
use crate::db::users;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_public: bool,
}

impl From<NoteRequest> for NoteInput {
    fn from(request: NoteRequest) -> Self {
        NoteInput {
            title: request.title,
            body: request.body,
            is_private: request.is_private,
            is_public: request.is_public,
        }
    }
}

/// Invite list is only disclosed to the owner
async fn note_view(state: &AppState, note: Note, caller_id: i64) -> ApiResult<NoteView> {
    let invited = if note.owner_id == caller_id {
        Some(notes::invitees(&state.db, note.id).await?)
    } else {
        None
    };
    Ok(NoteView::new(note, invited))
}

async fn owned_note(state: &AppState, current: &CurrentSession, id: i64) -> ApiResult<Note> {
    let note = notes::require_note(&state.db, id).await?;
    if note.owner_id != current.user_id() {
        return Err(ApiError::Forbidden(format!("Note {} belongs to another user", id)));
    }
    Ok(note)
}

/// GET /api/notes
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<NoteView>>> {
    let visible = notes::list_visible(&state.db, current.user_id()).await?;
    let mut views = Vec::with_capacity(visible.len());
    for note in visible {
        views.push(note_view(&state, note, current.user_id()).await?);
    }
    Ok(Json(views))
}

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let note = notes::create_note(&state.db, current.user_id(), &request.into()).await?;
    info!(note_id = note.id, user_id = current.user_id(), "Created note");

    let view = note_view(&state, note, current.user_id()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<NoteView>> {
    let note = notes::require_note(&state.db, id).await?;
    let invited = notes::is_invited(&state.db, note.id, current.user_id()).await?;
    if !can_view_note(&note, current.user_id(), invited) {
        return Err(ApiError::Forbidden(format!("Note {} is not shared with you", id)));
    }
    Ok(Json(note_view(&state, note, current.user_id()).await?))
}

/// PUT /api/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<Json<NoteView>> {
    owned_note(&state, &current, id).await?;
    let note = notes::update_note(&state.db, id, &request.into()).await?;
    Ok(Json(note_view(&state, note, current.user_id()).await?))
}

/// DELETE /api/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    owned_note(&state, &current, id).await?;
    notes::delete_note(&state.db, id).await?;
    info!(note_id = id, user_id = current.user_id(), "Deleted note");
    Ok(Json(json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

/// PUT /api/notes/:id/share
///
/// Replaces the invite list. Unknown users and the owner are dropped.
pub async fn share_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<ShareRequest>,
) -> ApiResult<Json<NoteView>> {
    let note = owned_note(&state, &current, id).await?;

    let mut invitees = Vec::new();
    for user_id in request.user_ids {
        if user_id == note.owner_id || invitees.contains(&user_id) {
            continue;
        }
        if users::get_user(&state.db, user_id).await?.is_some() {
            invitees.push(user_id);
        }
    }
    notes::set_invitees(&state.db, note.id, &invitees).await?;
    info!(note_id = note.id, invitees = invitees.len(), "Updated note sharing");

    Ok(Json(note_view(&state, note, current.user_id()).await?))
}
