//! Notes and note sharing

use chrono::Utc;
use mlib_common::db::{db_timestamp, Note};
use mlib_common::{Error, Result};
use sqlx::SqlitePool;

const NOTE_COLUMNS: &str =
    "n.id, n.title, n.body, n.owner_id, n.is_private, n.is_public, n.created_at, n.updated_at";

/// Editable note fields
#[derive(Debug, Clone)]
pub struct NoteInput {
    pub title: String,
    pub body: String,
    pub is_private: bool,
    pub is_public: bool,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Note title is required".to_string()));
    }
    Ok(title.to_string())
}

pub async fn create_note(pool: &SqlitePool, owner_id: i64, input: &NoteInput) -> Result<Note> {
    let title = validate_title(&input.title)?;
    let now = db_timestamp(Utc::now());

    let id = sqlx::query(
        r#"
        INSERT INTO notes (title, body, owner_id, is_private, is_public, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&title)
    .bind(&input.body)
    .bind(owner_id)
    .bind(input.is_private)
    .bind(input.is_public)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    require_note(pool, id).await
}

pub async fn get_note(pool: &SqlitePool, id: i64) -> Result<Option<Note>> {
    let sql = format!("SELECT {} FROM notes n WHERE n.id = ?", NOTE_COLUMNS);
    let note = sqlx::query_as::<_, Note>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(note)
}

pub async fn require_note(pool: &SqlitePool, id: i64) -> Result<Note> {
    get_note(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))
}

/// Notes the user may read: own, public non-private, or shared with them
pub async fn list_visible(pool: &SqlitePool, user_id: i64) -> Result<Vec<Note>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM notes n
        WHERE n.owner_id = ?
           OR (n.is_private = 0 AND n.is_public = 1)
           OR EXISTS (SELECT 1 FROM note_invites i WHERE i.note_id = n.id AND i.user_id = ?)
        ORDER BY n.updated_at DESC, n.id DESC
        "#,
        NOTE_COLUMNS
    );
    let notes = sqlx::query_as::<_, Note>(&sql)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(notes)
}

pub async fn update_note(pool: &SqlitePool, id: i64, input: &NoteInput) -> Result<Note> {
    let title = validate_title(&input.title)?;
    sqlx::query(
        r#"
        UPDATE notes
        SET title = ?, body = ?, is_private = ?, is_public = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(&input.body)
    .bind(input.is_private)
    .bind(input.is_public)
    .bind(db_timestamp(Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;

    require_note(pool, id).await
}

pub async fn delete_note(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_invited(pool: &SqlitePool, note_id: i64, user_id: i64) -> Result<bool> {
    let invited: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM note_invites WHERE note_id = ? AND user_id = ?)",
    )
    .bind(note_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(invited)
}

/// Ids of users the note is shared with
pub async fn invitees(pool: &SqlitePool, note_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM note_invites WHERE note_id = ? ORDER BY user_id ASC",
    )
    .bind(note_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Replace the invite list in one transaction
pub async fn set_invitees(pool: &SqlitePool, note_id: i64, user_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM note_invites WHERE note_id = ?")
        .bind(note_id)
        .execute(&mut *tx)
        .await?;

    for user_id in user_ids {
        sqlx::query("INSERT OR IGNORE INTO note_invites (note_id, user_id) VALUES (?, ?)")
            .bind(note_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
