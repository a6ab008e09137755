//! Playlists and their ordered items

use chrono::Utc;
use mlib_common::db::{db_timestamp, Playlist};
use mlib_common::{Error, Result};
use sqlx::SqlitePool;

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Playlist name is required".to_string()));
    }
    Ok(name.to_string())
}

pub async fn create_playlist(pool: &SqlitePool, owner_id: i64, name: &str) -> Result<Playlist> {
    let name = validate_name(name)?;
    let id = sqlx::query("INSERT INTO playlists (name, owner_id, created_at) VALUES (?, ?, ?)")
        .bind(&name)
        .bind(owner_id)
        .bind(db_timestamp(Utc::now()))
        .execute(pool)
        .await?
        .last_insert_rowid();

    require_playlist(pool, id).await
}

pub async fn get_playlist(pool: &SqlitePool, id: i64) -> Result<Option<Playlist>> {
    let playlist = sqlx::query_as::<_, Playlist>(
        "SELECT id, name, owner_id, created_at FROM playlists WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(playlist)
}

pub async fn require_playlist(pool: &SqlitePool, id: i64) -> Result<Playlist> {
    get_playlist(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Playlist {} not found", id)))
}

/// Playlists owned by a user, newest first
pub async fn list_for_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Playlist>> {
    let playlists = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, name, owner_id, created_at
        FROM playlists
        WHERE owner_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(playlists)
}

pub async fn rename_playlist(pool: &SqlitePool, id: i64, name: &str) -> Result<()> {
    let name = validate_name(name)?;
    sqlx::query("UPDATE playlists SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a playlist and its item links; the files are untouched
pub async fn delete_playlist(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// File ids of a playlist in playback order
pub async fn item_ids(pool: &SqlitePool, playlist_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT file_id FROM playlist_items WHERE playlist_id = ? ORDER BY position ASC, file_id ASC",
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn contains(pool: &SqlitePool, playlist_id: i64, file_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM playlist_items WHERE playlist_id = ? AND file_id = ?)",
    )
    .bind(playlist_id)
    .bind(file_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Append a file to the end of a playlist
///
/// Returns false without touching the playlist when the file is already in it.
pub async fn add_item(pool: &SqlitePool, playlist_id: i64, file_id: i64) -> Result<bool> {
    if contains(pool, playlist_id, file_id).await? {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO playlist_items (playlist_id, file_id, position)
        VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_items WHERE playlist_id = ?))
        "#,
    )
    .bind(playlist_id)
    .bind(file_id)
    .bind(playlist_id)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Remove a file from a playlist; returns false when it was not there
pub async fn remove_item(pool: &SqlitePool, playlist_id: i64, file_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM playlist_items WHERE playlist_id = ? AND file_id = ?")
        .bind(playlist_id)
        .bind(file_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
