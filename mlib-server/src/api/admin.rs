//! Maintenance endpoints (administrators only)

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use super::auth::CurrentSession;
use crate::ingest::maintenance::{self, MultimediaEntry, RegenerateReport};
use crate::trash::{self, PurgeReport};
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRequest {
    /// Rebuild thumbnails that already exist
    #[serde(default)]
    pub force: bool,
}

/// POST /api/admin/thumbnails/regenerate
pub async fn regenerate_thumbnails(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    body: Option<Json<RegenerateRequest>>,
) -> ApiResult<Json<RegenerateReport>> {
    current.require_admin()?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let report = maintenance::regenerate_thumbnails(&state.db, &state.converter, request.force).await?;
    Ok(Json(report))
}

/// POST /api/admin/trash/purge
pub async fn purge_trash(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<PurgeReport>> {
    current.require_admin()?;
    let report = trash::purge_expired(&state.db, state.config.trash_retention_days, Utc::now()).await?;
    Ok(Json(report))
}

/// GET /api/admin/multimedia
pub async fn multimedia(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<MultimediaEntry>>> {
    current.require_admin()?;
    Ok(Json(maintenance::multimedia_report(&state.db, &state.converter).await?))
}
