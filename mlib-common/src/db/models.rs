//! Database models
//!
//! Row types shared by the Content Store queries. Timestamps are stored as
//! RFC 3339 text and always written through [`db_timestamp`], never by SQL
//! defaults, so that lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Format a timestamp for storage: UTC, fixed microsecond precision
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Uploaded file record (`files` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: i64,
    /// Display name, also the stored file name inside its upload folder
    pub name: String,
    /// Storage locator (absolute path on disk)
    pub path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub is_private: bool,
    pub description: Option<String>,
    /// SHA-256 of the stored bytes, hex encoded
    pub content_hash: Option<String>,
    /// Set when the item is in the trash
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// True when the item has been moved to the trash
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Tag record (`tags` table). Names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub is_private: bool,
}

/// Tag with the number of items it is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// User account (`users` table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub avatar: String,
    pub is_admin: bool,
    /// Account-level private zone grant, copied into the session at login
    pub private_access: bool,
    pub created_at: DateTime<Utc>,
}

/// Playlist header (`playlists` table); items live in `playlist_items`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Note ("bloc") record (`notes` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub owner_id: i64,
    pub is_private: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
