//! Integration tests for the trash purge and the maintenance endpoints

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use helpers::TestApp;
use mlib_server::db::files;
use mlib_server::ingest::thumbnail_path;
use mlib_server::trash::purge_expired;
use serde_json::json;
use std::path::Path;

#[tokio::test]
async fn test_purge_removes_only_expired_items() {
    let app = TestApp::new().await;
    let old = app.seed("old.jpg", false, &["pets"]).await;
    let recent = app.seed("recent.jpg", false, &[]).await;
    let active = app.seed("active.jpg", false, &[]).await;
    let now = Utc::now();
    files::soft_delete(&app.state.db, old.id, now - Duration::days(10)).await.unwrap();
    files::soft_delete(&app.state.db, recent.id, now - Duration::days(1)).await.unwrap();

    let report = purge_expired(&app.state.db, 5, now).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.purged, 1);
    assert_eq!(report.failed, 0);
    assert!(files::get_file(&app.state.db, old.id).await.unwrap().is_none());
    assert!(!Path::new(&old.path).exists());
    assert!(!thumbnail_path(Path::new(&old.path)).exists());

    assert!(files::get_file(&app.state.db, recent.id).await.unwrap().is_some());
    assert!(Path::new(&recent.path).exists());
    assert!(files::get_file(&app.state.db, active.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_purge_continues_past_missing_files() {
    let app = TestApp::new().await;
    let gone = app.seed("gone.jpg", false, &[]).await;
    let present = app.seed("present.jpg", false, &[]).await;
    let long_ago = Utc::now() - Duration::days(30);
    files::soft_delete(&app.state.db, gone.id, long_ago).await.unwrap();
    files::soft_delete(&app.state.db, present.id, long_ago).await.unwrap();
    std::fs::remove_file(&gone.path).unwrap();

    let report = purge_expired(&app.state.db, 5, Utc::now()).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.purged, 2);
    assert!(files::get_file(&app.state.db, gone.id).await.unwrap().is_none());
    assert!(files::get_file(&app.state.db, present.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_purge_endpoint() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let file = app.seed("old.jpg", false, &[]).await;
    files::soft_delete(&app.state.db, file.id, Utc::now() - Duration::days(6))
        .await
        .unwrap();

    let (status, body) = app.post_empty("/api/admin/trash/purge", &admin).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["purged"], 1);
}

#[tokio::test]
async fn test_regenerate_thumbnails() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let photo = app.seed("cat.jpg", false, &[]).await;
    app.seed("song.mp3", false, &[]).await;
    std::fs::remove_file(thumbnail_path(Path::new(&photo.path))).unwrap();

    let (status, body) = app.post_empty("/api/admin/thumbnails/regenerate", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["generated"], 1);
    assert!(thumbnail_path(Path::new(&photo.path)).exists());

    let (_, body) = app.post_empty("/api/admin/thumbnails/regenerate", &admin).await;
    assert_eq!(body["processed"], 0);

    let (_, body) = app
        .post("/api/admin/thumbnails/regenerate", &admin, json!({ "force": true }))
        .await;
    assert_eq!(body["processed"], 1);
}

#[tokio::test]
async fn test_regenerate_skips_slot_owned_by_another_item() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let photo = app.seed("cat.jpg", false, &[]).await;
    let slot = thumbnail_path(Path::new(&photo.path));
    std::fs::write(&slot, b"user photo").unwrap();
    files::insert_file(
        &app.state.db,
        &files::NewFile {
            name: "thumb_cat.jpg".to_string(),
            path: slot.to_string_lossy().into_owned(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 10,
            is_private: false,
            content_hash: None,
        },
    )
    .await
    .unwrap();

    let (status, body) = app
        .post("/api/admin/thumbnails/regenerate", &admin, json!({ "force": true }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nameConflicts"], 1);
    assert_eq!(body["processed"], 1);
    assert_eq!(std::fs::read(&slot).unwrap(), b"user photo");
}

#[tokio::test]
async fn test_multimedia_report() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    app.seed("clip.mp4", false, &[]).await;
    app.seed("song.wma", false, &[]).await;
    app.seed("cat.jpg", false, &[]).await;
    app.seed("private.mp4", true, &[]).await;

    let (status, body) = app.get("/api/admin/multimedia", &admin).await;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let clip = entries.iter().find(|e| e["name"] == "clip.mp4").unwrap();
    assert_eq!(clip["codecs"]["recommended"], true);
    assert_eq!(clip["convertible"], true);
}
