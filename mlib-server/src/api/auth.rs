//! Accounts, sessions and the private-zone grant

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use mlib_common::CallerContext;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::views::UserView;
use crate::db::users;
use crate::session::{Session, SESSION_COOKIE};
use crate::{ApiError, ApiResult, AppState};

/// Session attached to an authenticated request
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
    pub session: Session,
}

impl CurrentSession {
    pub fn caller(&self) -> &CallerContext {
        &self.session.caller
    }

    pub fn user_id(&self) -> i64 {
        self.session.caller.user_id
    }

    pub fn has_private_access(&self) -> bool {
        self.session.has_private_access()
    }

    /// Fail with Forbidden unless the private zone is unlocked
    pub fn require_private_access(&self) -> ApiResult<()> {
        if self.has_private_access() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Private zone is locked".to_string()))
        }
    }

    /// Fail with Forbidden unless the caller is an administrator
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.session.caller.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Administrator access required".to_string()))
        }
    }

    /// Store the (modified) session snapshot
    pub async fn save(self, state: &AppState) {
        state.sessions.put(&self.id, self.session).await;
    }
}

/// Middleware resolving the session cookie into a [`CurrentSession`]
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;

    req.extensions_mut().insert(CurrentSession { id, session });
    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    fn validated(self) -> ApiResult<(String, String)> {
        let username = users::normalize_username(&self.username);
        if username.is_empty() || self.password.is_empty() {
            return Err(ApiError::BadRequest("Username and password are required".to_string()));
        }
        Ok((username, self.password))
    }
}

/// Hash a password on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Create the first administrator when no accounts exist yet
///
/// Returns true when an account was created.
pub async fn ensure_admin_account(state: &AppState, username: &str, password: &str) -> ApiResult<bool> {
    if users::count_users(&state.db).await? > 0 {
        return Ok(false);
    }

    let username = users::normalize_username(username);
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Admin username and password are required".to_string()));
    }

    let hash = hash_password(password.to_string(), state.config.bcrypt_cost).await?;
    let user = users::create_user(&state.db, &username, &hash, true, true).await?;
    info!(user_id = user.id, username = %user.username, "Created initial administrator");
    Ok(true)
}

async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let (username, password) = credentials.validated()?;

    if users::find_by_username(&state.db, &username).await?.is_some() {
        return Err(ApiError::Conflict(format!("Username '{}' is taken", username)));
    }

    let hash = hash_password(password, state.config.bcrypt_cost).await?;
    let user = users::create_user(&state.db, &username, &hash, false, false).await?;
    info!(user_id = user.id, username = %user.username, "Registered user");

    Ok((StatusCode::CREATED, Json(UserView::new(&user, false))))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let (username, password) = credentials.validated()?;
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = users::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(invalid)?;
    if user.password_hash.is_empty() || !verify_password(password, user.password_hash.clone()).await {
        warn!(username = %username, "Failed login");
        return Err(invalid());
    }

    let caller = CallerContext {
        user_id: user.id,
        username: user.username.clone(),
        is_admin: user.is_admin,
        has_private_access: user.private_access,
    };
    let id = state.sessions.create(caller).await;
    info!(user_id = user.id, username = %user.username, "Logged in");

    let body = json!({
        "authenticated": true,
        "user": UserView::new(&user, user.private_access),
    });
    Ok((jar.add(session_cookie(id)), Json(body)))
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "authenticated": false })))
}

/// GET /api/session
pub async fn session_status(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<serde_json::Value>> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(Json(json!({ "authenticated": false })));
    };
    let Some(session) = state.sessions.get(cookie.value()).await else {
        return Ok(Json(json!({ "authenticated": false })));
    };
    let Some(user) = users::get_user(&state.db, session.caller.user_id).await? else {
        return Ok(Json(json!({ "authenticated": false })));
    };

    Ok(Json(json!({
        "authenticated": true,
        "user": UserView::new(&user, session.has_private_access()),
    })))
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub passphrase: String,
}

/// POST /api/private/unlock
///
/// Grants private access to this session when the passphrase matches.
pub async fn unlock_private(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
    Json(request): Json<UnlockRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.config.private_zone_enabled() || request.passphrase != state.config.private_passphrase {
        warn!(user_id = current.user_id(), "Rejected private zone passphrase");
        return Err(ApiError::Forbidden("Incorrect passphrase".to_string()));
    }

    current.session.caller.has_private_access = true;
    info!(user_id = current.user_id(), "Private zone unlocked");
    current.save(&state).await;

    Ok(Json(json!({ "privateAccess": true })))
}

/// POST /api/private/lock
pub async fn lock_private(
    State(state): State<AppState>,
    Extension(mut current): Extension<CurrentSession>,
) -> Json<serde_json::Value> {
    current.session.caller.has_private_access = false;
    current.save(&state).await;
    Json(json!({ "privateAccess": false }))
}
