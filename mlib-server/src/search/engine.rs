//! Tag search over the Content Store
//!
//! Inclusion terms become `EXISTS` filters and exclusion terms `NOT EXISTS`
//! filters on `file_tags`, so an item matching several terms is never
//! repeated and term order does not matter.

use mlib_common::db::{FileRecord, TagCount};
use mlib_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::query::{escape_like, SortKey, TagQuery};
use super::suggest::{rank_suggestions, PartialTerm};

/// Which items are candidates for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Public items, plus private items when the caller holds the grant
    Visible { has_private_access: bool },
    /// Private items only (private-zone search)
    PrivateOnly,
}

impl SearchScope {
    fn private_tags_match(self) -> bool {
        match self {
            SearchScope::Visible { has_private_access } => has_private_access,
            SearchScope::PrivateOnly => true,
        }
    }
}

/// Resolve a tag query into sorted, visible, deduplicated files
///
/// An empty query yields no results.
pub async fn search_files(
    pool: &SqlitePool,
    query: &TagQuery,
    order: SortKey,
    scope: SearchScope,
) -> Result<Vec<FileRecord>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT f.id, f.name, f.path, f.mime_type, f.size_bytes, f.uploaded_at, \
         f.is_private, f.description, f.content_hash, f.deleted_at \
         FROM files f \
         WHERE f.deleted_at IS NULL \
         AND EXISTS (SELECT 1 FROM file_tags ft WHERE ft.file_id = f.id)",
    );

    match scope {
        SearchScope::Visible { has_private_access: false } => {
            qb.push(" AND f.is_private = 0");
        }
        SearchScope::Visible { has_private_access: true } => {}
        SearchScope::PrivateOnly => {
            qb.push(" AND f.is_private = 1");
        }
    }

    let tag_visibility = if scope.private_tags_match() {
        ""
    } else {
        " AND t.is_private = 0"
    };

    for (terms, negate) in [(&query.include, false), (&query.exclude, true)] {
        for term in terms {
            qb.push(if negate { " AND NOT EXISTS (" } else { " AND EXISTS (" })
                .push(
                    "SELECT 1 FROM file_tags ft JOIN tags t ON t.id = ft.tag_id \
                     WHERE ft.file_id = f.id AND t.name = ",
                )
                .push_bind(term.clone())
                .push(tag_visibility)
                .push(")");
        }
    }

    qb.push(" ORDER BY ").push(order.order_by_sql());

    let files = qb.build_query_as::<FileRecord>().fetch_all(pool).await?;
    Ok(files)
}

/// Type-ahead suggestions for the last token of `input`
///
/// Counts only visible items; tags without any are dropped.
pub async fn suggest_tags(
    pool: &SqlitePool,
    input: &str,
    has_private_access: bool,
) -> Result<Vec<TagCount>> {
    let Some(term) = PartialTerm::from_input(input) else {
        return Ok(Vec::new());
    };

    let visibility = if has_private_access {
        ""
    } else {
        "AND t.is_private = 0 AND f.is_private = 0"
    };

    let sql = format!(
        r#"
        SELECT t.name AS name, COUNT(DISTINCT f.id) AS count
        FROM tags t
        JOIN file_tags ft ON ft.tag_id = t.id
        JOIN files f ON f.id = ft.file_id
        WHERE f.deleted_at IS NULL
          AND t.name LIKE ? ESCAPE '\'
          {}
        GROUP BY t.id, t.name
        "#,
        visibility
    );

    let candidates = sqlx::query_as::<_, TagCount>(&sql)
        .bind(format!("{}%", escape_like(&term.prefix)))
        .fetch_all(pool)
        .await?;

    Ok(rank_suggestions(candidates)
        .into_iter()
        .map(|tag| TagCount {
            name: term.display(&tag.name),
            count: tag.count,
        })
        .collect())
}
