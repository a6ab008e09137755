//! JSON views of records
//!
//! Views apply the Access Policy on the way out: media URLs only for
//! viewable files whose bytes exist, private tags only for callers holding
//! the private-zone grant.

use chrono::{DateTime, Utc};
use mlib_common::access::can_view;
use mlib_common::db::{FileRecord, Note, Playlist, Tag, User};
use mlib_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::Path;

use crate::db::{favorites, files, tags};
use crate::ingest::thumbnail_path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub avatar: String,
    pub is_admin: bool,
    pub has_private_access: bool,
}

impl UserView {
    /// `has_private_access` reflects the session grant, not the account flag
    pub fn new(user: &User, has_private_access: bool) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            is_admin: user.is_admin,
            has_private_access,
        }
    }
}

/// Account as seen by an administrator
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: i64,
    pub username: String,
    pub avatar: String,
    pub is_admin: bool,
    pub private_access: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            is_admin: user.is_admin,
            private_access: user.private_access,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub is_private: bool,
    pub is_favorite: bool,
    pub thumbnail_url: Option<String>,
    pub media_url: Option<String>,
    pub tags: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

fn media_url(file: &FileRecord, path: &Path, has_private_access: bool) -> Option<String> {
    if !can_view(file, has_private_access) || !path.is_file() {
        return None;
    }
    let name = path.file_name()?.to_string_lossy();
    Some(format!("/media/{}", name))
}

/// Serialize one file for a caller
pub async fn file_view(
    pool: &SqlitePool,
    file: &FileRecord,
    has_private_access: bool,
    favorite_ids: &HashSet<i64>,
) -> Result<FileView> {
    let path = Path::new(&file.path);
    let tag_names = tags::tags_for_file(pool, file.id, has_private_access)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    Ok(FileView {
        id: file.id,
        name: file.name.clone(),
        description: file.description.clone().unwrap_or_default(),
        mime_type: file.mime_type.clone(),
        size: file.size_bytes,
        uploaded_at: file.uploaded_at,
        is_private: file.is_private,
        is_favorite: favorite_ids.contains(&file.id),
        thumbnail_url: media_url(file, &thumbnail_path(path), has_private_access),
        media_url: media_url(file, path, has_private_access),
        tags: tag_names,
        deleted_at: file.deleted_at,
    })
}

/// Serialize a list of files, loading the caller's favorites once
pub async fn file_views(
    pool: &SqlitePool,
    files: &[FileRecord],
    user_id: i64,
    has_private_access: bool,
) -> Result<Vec<FileView>> {
    let favorite_ids = favorites::favorite_ids(pool, user_id).await?;
    let mut views = Vec::with_capacity(files.len());
    for file in files {
        views.push(file_view(pool, file, has_private_access, &favorite_ids).await?);
    }
    Ok(views)
}

/// Load and serialize the viewable files among `ids`, keeping their order
pub async fn visible_file_views(
    pool: &SqlitePool,
    ids: &[i64],
    user_id: i64,
    has_private_access: bool,
) -> Result<Vec<FileView>> {
    let mut visible = Vec::new();
    for &id in ids {
        if let Some(file) = files::get_file(pool, id).await? {
            if can_view(&file, has_private_access) {
                visible.push(file);
            }
        }
    }
    file_views(pool, &visible, user_id, has_private_access).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub id: i64,
    pub name: String,
    pub is_private: bool,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            is_private: tag.is_private,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Viewable items in playlist order
    pub items: Vec<FileView>,
}

pub async fn playlist_view(
    pool: &SqlitePool,
    playlist: &Playlist,
    has_private_access: bool,
) -> Result<PlaylistView> {
    let ids = crate::db::playlists::item_ids(pool, playlist.id).await?;
    let items = visible_file_views(pool, &ids, playlist.owner_id, has_private_access).await?;
    Ok(PlaylistView {
        id: playlist.id,
        name: playlist.name.clone(),
        created_at: playlist.created_at,
        items,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub owner_id: i64,
    pub is_private: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only disclosed to the owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_user_ids: Option<Vec<i64>>,
}

impl NoteView {
    pub fn new(note: Note, invited_user_ids: Option<Vec<i64>>) -> Self {
        Self {
            id: note.id,
            title: note.title,
            body: note.body,
            owner_id: note.owner_id,
            is_private: note.is_private,
            is_public: note.is_public,
            created_at: note.created_at,
            updated_at: note.updated_at,
            invited_user_ids,
        }
    }
}
