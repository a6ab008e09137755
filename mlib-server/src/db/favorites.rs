//! Per-user favorites set

use mlib_common::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

pub async fn is_favorite(pool: &SqlitePool, user_id: i64, file_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ? AND file_id = ?)",
    )
    .bind(user_id)
    .bind(file_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Add or remove a favorite; both directions are idempotent
pub async fn set_favorite(pool: &SqlitePool, user_id: i64, file_id: i64, favorite: bool) -> Result<()> {
    let sql = if favorite {
        "INSERT OR IGNORE INTO favorites (user_id, file_id) VALUES (?, ?)"
    } else {
        "DELETE FROM favorites WHERE user_id = ? AND file_id = ?"
    };
    sqlx::query(sql)
        .bind(user_id)
        .bind(file_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Ids of every file the user marked as favorite
pub async fn favorite_ids(pool: &SqlitePool, user_id: i64) -> Result<HashSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT file_id FROM favorites WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}
