//! HTTP API handlers for mlib-server

pub mod admin;
pub mod auth;
pub mod files;
pub mod health;
pub mod media;
pub mod notes;
pub mod player;
pub mod playlists;
pub mod queue;
pub mod tags;
pub mod users;
pub mod views;

pub use auth::{require_session, CurrentSession};
pub use health::health_routes;
