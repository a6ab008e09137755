//! mlib-server library - personal media library service
//!
//! Content Store queries, the Tag Query Engine, Media Ingestion, the Playback
//! and Ad-hoc queues, session handling, trash purge and the HTTP API.

use axum::Router;
use mlib_common::config::{ServiceConfig, StorageLayout};
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;
pub mod playback;
pub mod search;
pub mod session;
pub mod trash;

pub use error::{ApiError, ApiResult};

use ingest::MediaConverter;
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
    pub layout: Arc<StorageLayout>,
    pub sessions: SessionStore,
    /// External media tools (thumbnails, conversions)
    pub converter: Arc<dyn MediaConverter>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        config: ServiceConfig,
        layout: StorageLayout,
        converter: Arc<dyn MediaConverter>,
    ) -> Self {
        let ttl = chrono::Duration::minutes(config.session_ttl_minutes as i64);
        Self {
            db,
            config: Arc::new(config),
            layout: Arc::new(layout),
            sessions: SessionStore::new(ttl),
            converter,
        }
    }
}

/// Build application router
///
/// `/health`, registration, login, logout and session status are public;
/// everything else requires a session.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{delete, get, post, put};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        // Private zone
        .route("/api/private/unlock", post(api::auth::unlock_private))
        .route("/api/private/lock", post(api::auth::lock_private))
        .route("/api/private/search", get(api::tags::private_search))
        .route("/api/private/files", get(api::tags::private_files))
        // Files
        .route("/api/files", get(api::files::list_files).post(api::files::upload_files))
        .route("/api/files/:id", get(api::files::get_file).delete(api::files::delete_file))
        .route("/api/files/:id/favorite", post(api::files::set_favorite))
        .route("/api/files/:id/description", put(api::files::edit_description))
        .route("/api/files/:id/tags", post(api::files::edit_tags))
        .route("/api/files/:id/convert", post(api::files::convert_file))
        .route("/api/favorites", get(api::files::list_favorites))
        .route("/api/trash", get(api::files::list_trash))
        .route("/api/trash/:id/restore", post(api::files::restore_file))
        // Tag search
        .route("/api/search", get(api::tags::search))
        .route("/api/tags", get(api::tags::list_tags))
        .route("/api/tags/top", get(api::tags::top_tags))
        .route("/api/tags/suggest", get(api::tags::suggest))
        // Playlists
        .route(
            "/api/playlists",
            get(api::playlists::list_playlists).post(api::playlists::create_playlist),
        )
        .route(
            "/api/playlists/:id",
            get(api::playlists::get_playlist)
                .put(api::playlists::rename_playlist)
                .delete(api::playlists::delete_playlist),
        )
        .route("/api/playlists/:id/items", post(api::playlists::add_item))
        .route("/api/playlists/:id/items/:file_id", delete(api::playlists::remove_item))
        // Playback queue
        .route("/api/player", get(api::player::show))
        .route("/api/player/start/:playlist_id", post(api::player::start))
        .route("/api/player/next", post(api::player::next))
        .route("/api/player/previous", post(api::player::previous))
        .route("/api/player/shuffle", post(api::player::toggle_shuffle))
        // Ad-hoc queue
        .route("/api/queue", get(api::queue::list_queue))
        .route("/api/queue/clear", post(api::queue::clear_queue))
        .route("/api/queue/play/:position", get(api::queue::play_from))
        .route(
            "/api/queue/:file_id",
            post(api::queue::append).delete(api::queue::remove),
        )
        // Notes
        .route("/api/notes", get(api::notes::list_notes).post(api::notes::create_note))
        .route(
            "/api/notes/:id",
            get(api::notes::get_note)
                .put(api::notes::update_note)
                .delete(api::notes::delete_note),
        )
        .route("/api/notes/:id/share", put(api::notes::share_note))
        // Users and administration
        .route("/api/users", get(api::users::list_users))
        .route("/api/admin/users", get(api::users::admin_list_users))
        .route("/api/admin/users/:id", put(api::users::admin_update_user))
        .route("/api/admin/thumbnails/regenerate", post(api::admin::regenerate_thumbnails))
        .route("/api/admin/trash/purge", post(api::admin::purge_trash))
        .route("/api/admin/multimedia", get(api::admin::multimedia))
        // Media bytes
        .route("/media/:name", get(api::media::serve_media))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_session,
        ));

    // Public routes (no session)
    let public = Router::new()
        .route("/api/register", post(api::auth::register))
        .route("/api/login", post(api::auth::login))
        .route("/api/logout", post(api::auth::logout))
        .route("/api/session", get(api::auth::session_status))
        .route("/api/build_info", get(api::health::build_info))
        .merge(api::health_routes());

    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
