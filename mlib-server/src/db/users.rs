//! User accounts

use chrono::Utc;
use mlib_common::db::{db_timestamp, User};
use mlib_common::{Error, Result};
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, username, password_hash, avatar, is_admin, private_access, created_at";

/// Normalize a login name: trimmed and lower-cased
pub fn normalize_username(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Create a user; a taken username is a [`Error::Conflict`]
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    is_admin: bool,
    private_access: bool,
) -> Result<User> {
    let username = normalize_username(username);
    if username.is_empty() {
        return Err(Error::InvalidInput("Username cannot be empty".to_string()));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, is_admin, private_access, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&username)
    .bind(password_hash)
    .bind(is_admin)
    .bind(private_access)
    .bind(db_timestamp(Utc::now()))
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("Username '{}' is taken", username))
        }
        other => Error::Database(other),
    })?
    .last_insert_rowid();

    get_user(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(normalize_username(username))
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// All users ordered by name
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY username ASC", USER_COLUMNS);
    let users = sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?;
    Ok(users)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Admin-editable account fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub is_admin: Option<bool>,
    pub private_access: Option<bool>,
    pub avatar: Option<String>,
}

pub async fn update_user(pool: &SqlitePool, id: i64, update: &UserUpdate) -> Result<User> {
    let current = get_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))?;

    sqlx::query("UPDATE users SET is_admin = ?, private_access = ?, avatar = ? WHERE id = ?")
        .bind(update.is_admin.unwrap_or(current.is_admin))
        .bind(update.private_access.unwrap_or(current.private_access))
        .bind(update.avatar.as_deref().unwrap_or(&current.avatar))
        .bind(id)
        .execute(pool)
        .await?;

    get_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
}
