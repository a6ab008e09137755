//! File record persistence and listing

use chrono::{DateTime, Utc};
use mlib_common::db::{db_timestamp, FileRecord};
use mlib_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::search::query::{escape_like, SortKey};

/// Fields of a freshly ingested file
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub is_private: bool,
    pub content_hash: Option<String>,
}

/// Filters for the generic file listing
#[derive(Debug, Clone, Default)]
pub struct FileListFilter {
    /// Substring matched against name, description and MIME type
    pub search: Option<String>,
    /// MIME type prefix, e.g. `image/` or `video`
    pub mime_prefix: Option<String>,
    /// Restrict to the favorites of this user
    pub favorites_of: Option<i64>,
    /// Include private items (caller holds the private-zone grant)
    pub include_private: bool,
    /// Only private items
    pub private_only: bool,
    pub order: SortKey,
}

const FILE_COLUMNS: &str = "f.id, f.name, f.path, f.mime_type, f.size_bytes, f.uploaded_at, \
     f.is_private, f.description, f.content_hash, f.deleted_at";

/// Insert a new file record and return it
pub async fn insert_file(pool: &SqlitePool, file: &NewFile) -> Result<FileRecord> {
    let id = sqlx::query(
        r#"
        INSERT INTO files (name, path, mime_type, size_bytes, uploaded_at, is_private, content_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&file.name)
    .bind(&file.path)
    .bind(&file.mime_type)
    .bind(file.size_bytes)
    .bind(db_timestamp(Utc::now()))
    .bind(file.is_private)
    .bind(&file.content_hash)
    .execute(pool)
    .await?
    .last_insert_rowid();

    require_file(pool, id).await
}

/// Load a file by id, including trashed files
pub async fn get_file(pool: &SqlitePool, id: i64) -> Result<Option<FileRecord>> {
    let sql = format!("SELECT {} FROM files f WHERE f.id = ?", FILE_COLUMNS);
    let file = sqlx::query_as::<_, FileRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(file)
}

/// Load a file by id or fail with NotFound
pub async fn require_file(pool: &SqlitePool, id: i64) -> Result<FileRecord> {
    get_file(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {} not found", id)))
}

/// Find the most recent file stored under `name`
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files f WHERE f.name = ? ORDER BY f.id DESC LIMIT 1",
        FILE_COLUMNS
    );
    let file = sqlx::query_as::<_, FileRecord>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(file)
}

/// True when a record already uses `name`
pub async fn name_taken(pool: &SqlitePool, name: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE name = ?)")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

/// Generic listing of non-trashed files
pub async fn list_files(pool: &SqlitePool, filter: &FileListFilter) -> Result<Vec<FileRecord>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM files f WHERE f.deleted_at IS NULL",
        FILE_COLUMNS
    ));

    if filter.private_only {
        qb.push(" AND f.is_private = 1");
    } else if !filter.include_private {
        qb.push(" AND f.is_private = 0");
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (f.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR f.description LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR f.mime_type LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(prefix) = filter.mime_prefix.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND f.mime_type LIKE ")
            .push_bind(format!("{}%", escape_like(prefix)))
            .push(" ESCAPE '\\'");
    }

    if let Some(user_id) = filter.favorites_of {
        qb.push(" AND EXISTS (SELECT 1 FROM favorites fav WHERE fav.file_id = f.id AND fav.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    qb.push(" ORDER BY ").push(filter.order.order_by_sql());

    let files = qb.build_query_as::<FileRecord>().fetch_all(pool).await?;
    Ok(files)
}

/// Every non-trashed file, oldest first
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files f WHERE f.deleted_at IS NULL ORDER BY f.id ASC",
        FILE_COLUMNS
    );
    let files = sqlx::query_as::<_, FileRecord>(&sql).fetch_all(pool).await?;
    Ok(files)
}

/// Trashed files, most recently deleted first
pub async fn list_trash(pool: &SqlitePool, include_private: bool) -> Result<Vec<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files f WHERE f.deleted_at IS NOT NULL {} ORDER BY f.deleted_at DESC, f.id DESC",
        FILE_COLUMNS,
        if include_private { "" } else { "AND f.is_private = 0" }
    );
    let files = sqlx::query_as::<_, FileRecord>(&sql).fetch_all(pool).await?;
    Ok(files)
}

/// Trashed files deleted before `cutoff`
pub async fn list_expired_trash(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<Vec<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files f WHERE f.deleted_at IS NOT NULL AND f.deleted_at < ? ORDER BY f.id ASC",
        FILE_COLUMNS
    );
    let files = sqlx::query_as::<_, FileRecord>(&sql)
        .bind(db_timestamp(cutoff))
        .fetch_all(pool)
        .await?;
    Ok(files)
}

/// Replace the description; blank text clears it
pub async fn set_description(pool: &SqlitePool, id: i64, description: &str) -> Result<()> {
    let description = Some(description.trim()).filter(|d| !d.is_empty());
    sqlx::query("UPDATE files SET description = ? WHERE id = ?")
        .bind(description)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Move a file to the trash
///
/// Returns false when the file was already trashed.
pub async fn soft_delete(pool: &SqlitePool, id: i64, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query("UPDATE files SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(db_timestamp(now))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Take a file out of the trash
///
/// Returns false when the file was not trashed.
pub async fn restore(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE files SET deleted_at = NULL WHERE id = ? AND deleted_at IS NOT NULL")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove the record; tag, playlist and favorite links cascade
pub async fn hard_delete(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Rewrite name, locator and MIME type after an in-place conversion
pub async fn update_converted(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    path: &str,
    mime_type: &str,
    size_bytes: i64,
    content_hash: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE files
        SET name = ?, path = ?, mime_type = ?, size_bytes = ?, content_hash = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(path)
    .bind(mime_type)
    .bind(size_bytes)
    .bind(content_hash)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
