//! Integration tests for notes and note sharing

mod helpers;

use axum::http::StatusCode;
use helpers::{ids, TestApp};
use serde_json::json;

async fn user_id(app: &TestApp, cookie: &str) -> i64 {
    let (_, body) = app.get("/api/session", cookie).await;
    body["user"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_private_note_visible_to_owner_only() {
    let app = TestApp::new().await;
    let ana = app.register_and_login("ana").await;
    let bo = app.register_and_login("bo").await;

    let (status, note) = app
        .post("/api/notes", &ana, json!({ "title": "Diary", "body": "dear diary", "isPrivate": true }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/notes/{}", note["id"]);

    let (status, body) = app.get(&uri, &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "dear diary");
    assert_eq!(body["invitedUserIds"], json!([]));

    let (status, _) = app.get(&uri, &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, listing) = app.get("/api/notes", &bo).await;
    assert!(ids(&listing).is_empty());
}

#[tokio::test]
async fn test_public_note_visible_to_everyone() {
    let app = TestApp::new().await;
    let ana = app.register_and_login("ana").await;
    let bo = app.register_and_login("bo").await;

    let (_, note) = app
        .post("/api/notes", &ana, json!({ "title": "Recipes", "isPublic": true }))
        .await;

    let (status, body) = app.get(&format!("/api/notes/{}", note["id"]), &bo).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("invitedUserIds").is_none());

    let (_, listing) = app.get("/api/notes", &bo).await;
    assert_eq!(ids(&listing), vec![note["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn test_sharing_grants_read_access() {
    let app = TestApp::new().await;
    let ana = app.register_and_login("ana").await;
    let bo = app.register_and_login("bo").await;
    let ana_id = user_id(&app, &ana).await;
    let bo_id = user_id(&app, &bo).await;

    let (_, note) = app
        .post("/api/notes", &ana, json!({ "title": "Plans", "isPrivate": true }))
        .await;
    let uri = format!("/api/notes/{}", note["id"]);

    let (status, body) = app
        .put(
            &format!("{}/share", uri),
            &ana,
            json!({ "userIds": [bo_id, ana_id, 999, bo_id] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invitedUserIds"], json!([bo_id]));

    let (status, _) = app.get(&uri, &bo).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.put(&format!("{}/share", uri), &bo, json!({ "userIds": [] })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.put(&format!("{}/share", uri), &ana, json!({ "userIds": [] })).await;
    let (status, _) = app.get(&uri, &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_owner_mutates_note() {
    let app = TestApp::new().await;
    let ana = app.register_and_login("ana").await;
    let bo = app.register_and_login("bo").await;

    let (_, note) = app
        .post("/api/notes", &ana, json!({ "title": "Recipes", "isPublic": true }))
        .await;
    let uri = format!("/api/notes/{}", note["id"]);

    let (status, _) = app.put(&uri, &bo, json!({ "title": "Mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&uri, &ana, json!({ "title": "Soups", "body": "leek", "isPublic": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Soups");

    let (status, _) = app.put(&uri, &ana, json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&uri, &ana).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, &ana).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
