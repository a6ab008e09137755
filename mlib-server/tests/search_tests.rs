//! Integration tests for the tag query engine, suggestions and tag listings

mod helpers;

use axum::http::StatusCode;
use chrono::Utc;
use helpers::{ids, TestApp};
use mlib_server::db::{files, tags};
use mlib_server::search::{search_files, suggest_tags, SearchScope, SortKey, TagQuery};

const PUBLIC: SearchScope = SearchScope::Visible { has_private_access: false };
const GRANTED: SearchScope = SearchScope::Visible { has_private_access: true };

async fn search_ids(app: &TestApp, query: &str, scope: SearchScope) -> Vec<i64> {
    let mut found: Vec<i64> = search_files(&app.state.db, &TagQuery::parse(query), SortKey::Recent, scope)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    found.sort();
    found
}

#[tokio::test]
async fn test_inclusion_and_exclusion() {
    let app = TestApp::new().await;
    let a = app.seed("a.jpg", false, &["cats"]).await;
    let b = app.seed("b.jpg", false, &["cats", "dogs"]).await;
    let c = app.seed("c.jpg", false, &["dogs"]).await;

    assert_eq!(search_ids(&app, "cats -dogs", PUBLIC).await, vec![a.id]);
    assert_eq!(search_ids(&app, "cats", PUBLIC).await, vec![a.id, b.id]);
    assert_eq!(search_ids(&app, "dogs cats", PUBLIC).await, vec![b.id]);
    assert_eq!(search_ids(&app, "cats dogs", PUBLIC).await, vec![b.id]);
    assert_eq!(search_ids(&app, "-cats", PUBLIC).await, vec![c.id]);
    assert_eq!(search_ids(&app, "CATS cats", PUBLIC).await, vec![a.id, b.id]);
}

#[tokio::test]
async fn test_unknown_term_and_empty_query_yield_nothing() {
    let app = TestApp::new().await;
    app.seed("a.jpg", false, &["cats"]).await;
    app.seed("untagged.jpg", false, &[]).await;

    assert!(search_ids(&app, "cats unicorns", PUBLIC).await.is_empty());
    assert!(search_ids(&app, "", PUBLIC).await.is_empty());
    assert!(search_ids(&app, "   ", PUBLIC).await.is_empty());
    assert!(search_ids(&app, "-", PUBLIC).await.is_empty());
}

#[tokio::test]
async fn test_untagged_and_trashed_items_never_match() {
    let app = TestApp::new().await;
    let kept = app.seed("a.jpg", false, &["cats"]).await;
    let trashed = app.seed("b.jpg", false, &["cats"]).await;
    app.seed("untagged.jpg", false, &[]).await;
    files::soft_delete(&app.state.db, trashed.id, Utc::now()).await.unwrap();

    assert_eq!(search_ids(&app, "cats", PUBLIC).await, vec![kept.id]);
    assert_eq!(search_ids(&app, "-dogs", PUBLIC).await, vec![kept.id]);
}

#[tokio::test]
async fn test_private_items_and_tags() {
    let app = TestApp::new().await;
    let public = app.seed("a.jpg", false, &["cats"]).await;
    let private = app.seed("b.jpg", true, &["cats"]).await;
    tags::attach_names(&app.state.db, public.id, &["hidden".to_string()], true)
        .await
        .unwrap();

    assert_eq!(search_ids(&app, "cats", PUBLIC).await, vec![public.id]);
    assert_eq!(search_ids(&app, "cats", GRANTED).await, vec![public.id, private.id]);
    assert!(search_ids(&app, "hidden", PUBLIC).await.is_empty());
    assert_eq!(search_ids(&app, "hidden", GRANTED).await, vec![public.id]);
    assert_eq!(search_ids(&app, "cats", SearchScope::PrivateOnly).await, vec![private.id]);
}

#[tokio::test]
async fn test_search_sort_keys() {
    let app = TestApp::new().await;
    let small = app.seed("z.jpg", false, &["pics"]).await;
    let large = app.seed("a_much_longer_name.png", false, &["pics"]).await;

    let query = TagQuery::parse("pics");
    let order = |key: &str| {
        let db = app.state.db.clone();
        let query = query.clone();
        let key = SortKey::parse(Some(key));
        async move {
            search_files(&db, &query, key, PUBLIC)
                .await
                .unwrap()
                .into_iter()
                .map(|f| f.id)
                .collect::<Vec<i64>>()
        }
    };

    assert_eq!(order("size_desc").await, vec![large.id, small.id]);
    assert_eq!(order("size_asc").await, vec![small.id, large.id]);
    assert_eq!(order("type").await, vec![small.id, large.id]);
    assert_eq!(order("oldest").await, vec![small.id, large.id]);
    assert_eq!(order("recent").await, vec![large.id, small.id]);
    assert_eq!(order("bogus").await, vec![large.id, small.id]);
}

#[tokio::test]
async fn test_search_endpoint() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let a = app.seed("a.jpg", false, &["cats"]).await;
    app.seed("b.jpg", false, &["cats", "dogs"]).await;

    let (status, body) = app.get("/api/search?q=cats%20-dogs", &cookie).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["order"], "recent");
    assert_eq!(ids(&body["results"]), vec![a.id]);
}

#[tokio::test]
async fn test_private_search_endpoint() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    app.seed("a.jpg", false, &["cats"]).await;
    let private = app.seed("b.jpg", true, &["cats"]).await;

    let (status, _) = app.get("/api/private/search?q=cats", &cookie).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.unlock(&cookie).await;
    let (status, body) = app.get("/api/private/search?q=cats", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["results"]), vec![private.id]);

    let (_, body) = app.get("/api/private/files", &cookie).await;
    assert_eq!(ids(&body), vec![private.id]);
}

#[tokio::test]
async fn test_suggestions_respect_visibility_and_counts() {
    let app = TestApp::new().await;
    app.seed("a.jpg", false, &["cameras", "cars"]).await;
    app.seed("b.jpg", false, &["cars"]).await;
    app.seed("c.jpg", true, &["canals"]).await;
    let trashed = app.seed("d.jpg", false, &["candles"]).await;
    files::soft_delete(&app.state.db, trashed.id, Utc::now()).await.unwrap();
    let tagged = app.seed("e.jpg", false, &[]).await;
    tags::attach_names(&app.state.db, tagged.id, &["canon".to_string()], true)
        .await
        .unwrap();

    let found = suggest_tags(&app.state.db, "ca", false).await.unwrap();
    let names: Vec<(&str, i64)> = found.iter().map(|t| (t.name.as_str(), t.count)).collect();
    assert_eq!(names, vec![("cameras", 1), ("cars", 2)]);

    let found = suggest_tags(&app.state.db, "ca", true).await.unwrap();
    let names: Vec<&str> = found.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["cameras", "canals", "canon", "cars"]);
}

#[tokio::test]
async fn test_suggestions_use_last_token_and_exclusion_marker() {
    let app = TestApp::new().await;
    app.seed("a.jpg", false, &["dogs", "dots"]).await;

    let found = suggest_tags(&app.state.db, "cats -do", false).await.unwrap();
    let names: Vec<&str> = found.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["-dogs", "-dots"]);

    assert!(suggest_tags(&app.state.db, "", false).await.unwrap().is_empty());
    assert!(suggest_tags(&app.state.db, "d%", false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_suggest_endpoint_caps_results() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let names: Vec<String> = (0..12).map(|i| format!("tag{:02}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    app.seed("a.jpg", false, &refs).await;

    let (status, body) = app.get("/api/tags/suggest?q=tag", &cookie).await;

    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 10);
    assert_eq!(found[0]["name"], "tag00");
    assert_eq!(found[0]["count"], 1);
}

#[tokio::test]
async fn test_tag_listing_and_top_tags() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    app.seed("a.jpg", false, &["'quoted", "beach", "sun"]).await;
    app.seed("b.jpg", false, &["beach"]).await;
    app.seed("c.jpg", true, &["secret"]).await;

    let (_, body) = app.get("/api/tags", &cookie).await;
    let listed: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec!["beach", "sun", "'quoted"]);

    app.unlock(&cookie).await;
    let (_, body) = app.get("/api/tags", &cookie).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, body) = app.get("/api/tags/top?limit=2", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    let top = body.as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["name"], "beach");
    assert_eq!(top[0]["count"], 2);
}
