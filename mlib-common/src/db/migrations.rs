//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Tables are created with the current schema by `init_database`; migrations
//! only transform databases written by older deployments.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - installed databases depend on them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every step must be safe to run twice

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Password columns written by earlier deployments, in order of preference
const LEGACY_PASSWORD_COLUMNS: &[&str] = &["contraseña_hash", "contrasena_hash", "hashed_password"];

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Migration v1: consolidate legacy password columns into `password_hash`
///
/// Older deployments stored the hash under a localized column name. The value
/// is copied into the canonical column (only where that column is still
/// empty) and the legacy column is dropped, so no code path ever has to look
/// at more than one field.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: consolidate password hash column");

    if !has_column(pool, "users", "password_hash").await? {
        sqlx::query("ALTER TABLE users ADD COLUMN password_hash TEXT NOT NULL DEFAULT ''")
            .execute(pool)
            .await?;
        info!("  ✓ Added password_hash column to users table");
    }

    for legacy in LEGACY_PASSWORD_COLUMNS {
        if !has_column(pool, "users", legacy).await? {
            continue;
        }

        let copied = sqlx::query(&format!(
            r#"UPDATE users SET password_hash = "{legacy}"
               WHERE password_hash = '' AND "{legacy}" IS NOT NULL"#
        ))
        .execute(pool)
        .await?
        .rows_affected();

        sqlx::query(&format!(r#"ALTER TABLE users DROP COLUMN "{legacy}""#))
            .execute(pool)
            .await?;

        info!(
            "  ✓ Moved {} password hash(es) from legacy column '{}'",
            copied, legacy
        );
    }

    Ok(())
}
