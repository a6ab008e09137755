//! User directory and account administration

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::CurrentSession;
use super::views::AdminUserView;
use crate::db::users::{self, UserUpdate};
use crate::{ApiError, ApiResult, AppState};

/// Another account, as offered when sharing a note
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub avatar: String,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let others = users::list_users(&state.db)
        .await?
        .into_iter()
        .filter(|u| u.id != current.user_id())
        .map(|u| UserSummary {
            id: u.id,
            username: u.username,
            avatar: u.avatar,
        })
        .collect();
    Ok(Json(others))
}

/// GET /api/admin/users
pub async fn admin_list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<AdminUserView>>> {
    current.require_admin()?;
    let all = users::list_users(&state.db).await?;
    Ok(Json(all.iter().map(AdminUserView::from).collect()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub is_admin: Option<bool>,
    pub private_access: Option<bool>,
    pub avatar: Option<String>,
}

/// PUT /api/admin/users/:id
///
/// An administrator cannot revoke their own admin flag.
pub async fn admin_update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(request): Json<AdminUserUpdate>,
) -> ApiResult<Json<AdminUserView>> {
    current.require_admin()?;
    if id == current.user_id() && request.is_admin == Some(false) {
        return Err(ApiError::BadRequest(
            "Administrators cannot revoke their own admin flag".to_string(),
        ));
    }

    let update = UserUpdate {
        is_admin: request.is_admin,
        private_access: request.private_access,
        avatar: request.avatar,
    };
    let user = users::update_user(&state.db, id, &update).await?;
    info!(
        user_id = user.id,
        is_admin = user.is_admin,
        private_access = user.private_access,
        by = current.user_id(),
        "Updated user"
    );

    Ok(Json(AdminUserView::from(&user)))
}
