//! Tag persistence and file/tag links

use mlib_common::db::{Tag, TagCount};
use mlib_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::search::suggest::apostrophe_last;

/// Normalize a tag name: trimmed and lower-cased
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Split a comma separated tag field into normalized, unique names
pub fn parse_tag_list(field: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in field.split(',').map(normalize_tag_name) {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Find a tag by (normalized) name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, is_private FROM tags WHERE name = ?")
        .bind(normalize_tag_name(name))
        .fetch_optional(pool)
        .await?;
    Ok(tag)
}

/// Return the tag named `name`, creating it with the given privacy if missing
///
/// An existing tag keeps its privacy flag.
pub async fn get_or_create(pool: &SqlitePool, name: &str, is_private: bool) -> Result<Tag> {
    let name = normalize_tag_name(name);
    if name.is_empty() {
        return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
    }

    sqlx::query("INSERT OR IGNORE INTO tags (name, is_private) VALUES (?, ?)")
        .bind(&name)
        .bind(is_private)
        .execute(pool)
        .await?;

    find_by_name(pool, &name)
        .await?
        .ok_or_else(|| Error::Internal(format!("Tag '{}' vanished after insert", name)))
}

/// Link a tag to a file; no-op if already linked
pub async fn attach(pool: &SqlitePool, file_id: i64, tag_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?, ?)")
        .bind(file_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Unlink a tag from a file
pub async fn detach(pool: &SqlitePool, file_id: i64, tag_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM file_tags WHERE file_id = ? AND tag_id = ?")
        .bind(file_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Attach every name to the file, creating missing tags
pub async fn attach_names(
    pool: &SqlitePool,
    file_id: i64,
    names: &[String],
    is_private: bool,
) -> Result<()> {
    for name in names {
        let tag = get_or_create(pool, name, is_private).await?;
        attach(pool, file_id, tag.id).await?;
    }
    Ok(())
}

/// Rename a tag as seen from one file
///
/// When a tag named `to` already exists the file is moved onto it and the old
/// tag is left untouched for other files; otherwise the tag itself is renamed.
pub async fn rename_on_file(pool: &SqlitePool, file_id: i64, from: &str, to: &str) -> Result<()> {
    let to = normalize_tag_name(to);
    if to.is_empty() {
        return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
    }

    let Some(old) = find_by_name(pool, from).await? else {
        return Err(Error::NotFound(format!("Tag '{}' not found", from)));
    };
    if old.name == to {
        return Ok(());
    }

    match find_by_name(pool, &to).await? {
        Some(existing) => {
            detach(pool, file_id, old.id).await?;
            attach(pool, file_id, existing.id).await?;
            debug!(file_id, from = %old.name, to = %existing.name, "Moved file onto existing tag");
        }
        None => {
            sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
                .bind(&to)
                .bind(old.id)
                .execute(pool)
                .await?;
            debug!(tag_id = old.id, from = %old.name, to = %to, "Renamed tag");
        }
    }

    Ok(())
}

/// Remove a tag from a file by name; unknown names are ignored
pub async fn remove_from_file(pool: &SqlitePool, file_id: i64, name: &str) -> Result<()> {
    if let Some(tag) = find_by_name(pool, name).await? {
        detach(pool, file_id, tag.id).await?;
    }
    Ok(())
}

/// Tags attached to a file, private ones only when allowed
pub async fn tags_for_file(pool: &SqlitePool, file_id: i64, include_private: bool) -> Result<Vec<Tag>> {
    let sql = format!(
        r#"
        SELECT t.id, t.name, t.is_private
        FROM tags t
        JOIN file_tags ft ON ft.tag_id = t.id
        WHERE ft.file_id = ? {}
        ORDER BY t.name ASC
        "#,
        if include_private { "" } else { "AND t.is_private = 0" }
    );
    let tags = sqlx::query_as::<_, Tag>(&sql)
        .bind(file_id)
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

/// All visible tags, names starting with an apostrophe last
pub async fn list_tags(pool: &SqlitePool, include_private: bool) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT id, name, is_private FROM tags {} ORDER BY name ASC",
        if include_private { "" } else { "WHERE is_private = 0" }
    );
    let mut tags = sqlx::query_as::<_, Tag>(&sql).fetch_all(pool).await?;
    tags.sort_by(|a, b| apostrophe_last(&a.name, &b.name));
    Ok(tags)
}

/// Public tags with the most public, non-trashed files
pub async fn top_tags(pool: &SqlitePool, limit: i64) -> Result<Vec<TagCount>> {
    let tags = sqlx::query_as::<_, TagCount>(
        r#"
        SELECT t.name AS name, COUNT(DISTINCT f.id) AS count
        FROM tags t
        JOIN file_tags ft ON ft.tag_id = t.id
        JOIN files f ON f.id = ft.file_id
        WHERE t.is_private = 0 AND f.is_private = 0 AND f.deleted_at IS NULL
        GROUP BY t.id, t.name
        ORDER BY count DESC, t.name ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list(" Beach, sunset ,,beach, 'Old "),
            vec!["beach", "sunset", "'old"]
        );
        assert!(parse_tag_list(" , ").is_empty());
    }
}
