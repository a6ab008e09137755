//! Tag search, the private zone listing and tag lookups

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use mlib_common::db::TagCount;
use serde::{Deserialize, Serialize};

use super::auth::CurrentSession;
use super::views::{file_views, FileView, TagView};
use crate::db::files::{self, FileListFilter};
use crate::db::tags;
use crate::search::{self, SearchScope, SortKey, TagQuery};
use crate::{ApiResult, AppState};

const DEFAULT_TOP_TAGS: i64 = 10;
const MAX_TOP_TAGS: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub order: String,
    pub count: usize,
    pub results: Vec<FileView>,
}

async fn run_search(
    state: &AppState,
    current: &CurrentSession,
    params: SearchParams,
    scope: SearchScope,
) -> ApiResult<Json<SearchResponse>> {
    let query = TagQuery::parse(&params.q);
    let order = SortKey::parse(params.order.as_deref());

    let found = search::search_files(&state.db, &query, order, scope).await?;
    let results = file_views(&state.db, &found, current.user_id(), current.has_private_access()).await?;

    Ok(Json(SearchResponse {
        query: params.q,
        order: params.order.unwrap_or_else(|| "recent".to_string()),
        count: results.len(),
        results,
    }))
}

/// GET /api/search?q=&order=
pub async fn search(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let scope = SearchScope::Visible {
        has_private_access: current.has_private_access(),
    };
    run_search(&state, &current, params, scope).await
}

/// GET /api/private/search?q=&order=
pub async fn private_search(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    current.require_private_access()?;
    run_search(&state, &current, params, SearchScope::PrivateOnly).await
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderParams {
    pub order: Option<String>,
}

/// GET /api/private/files
pub async fn private_files(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<OrderParams>,
) -> ApiResult<Json<Vec<FileView>>> {
    current.require_private_access()?;

    let filter = FileListFilter {
        include_private: true,
        private_only: true,
        order: SortKey::parse(params.order.as_deref()),
        ..FileListFilter::default()
    };
    let found = files::list_files(&state.db, &filter).await?;
    Ok(Json(file_views(&state.db, &found, current.user_id(), true).await?))
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<TagView>>> {
    let found = tags::list_tags(&state.db, current.has_private_access()).await?;
    Ok(Json(found.into_iter().map(TagView::from).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopParams {
    pub limit: Option<i64>,
}

/// GET /api/tags/top?limit=
pub async fn top_tags(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> ApiResult<Json<Vec<TagCount>>> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_TAGS).clamp(1, MAX_TOP_TAGS);
    Ok(Json(tags::top_tags(&state.db, limit).await?))
}

/// GET /api/tags/suggest?q=
pub async fn suggest(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<TagCount>>> {
    let suggestions = search::suggest_tags(&state.db, &params.q, current.has_private_access()).await?;
    Ok(Json(suggestions))
}
