//! Integration tests for playlists, the playback transport and the ad-hoc queue

mod helpers;

use axum::http::StatusCode;
use helpers::{ids, TestApp};
use serde_json::{json, Value};

async fn playlist_with(app: &TestApp, cookie: &str, file_ids: &[i64]) -> i64 {
    let (status, body) = app.post("/api/playlists", cookie, json!({ "name": "Road trip" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    for file_id in file_ids {
        let (status, _) = app
            .post(&format!("/api/playlists/{}/items", id), cookie, json!({ "fileId": file_id }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

fn queue(player: &Value) -> Vec<i64> {
    player["queue"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_playlist_crud() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let song = app.seed("song.mp3", false, &[]).await;

    let (status, _) = app.post("/api/playlists", &cookie, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = playlist_with(&app, &cookie, &[song.id]).await;
    let uri = format!("/api/playlists/{}", id);

    let (status, body) = app.put(&uri, &cookie, json!({ "name": "Commute" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Commute");
    assert_eq!(ids(&body["items"]), vec![song.id]);

    let (_, listing) = app.get("/api/playlists", &cookie).await;
    assert_eq!(ids(&listing), vec![id]);

    let (status, _) = app.delete(&uri, &cookie).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, &cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Files survive their playlist
    let (status, _) = app.get(&format!("/api/files/{}", song.id), &cookie).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_playlists_belong_to_owner() {
    let app = TestApp::new().await;
    let ana = app.register_and_login("ana").await;
    let bo = app.register_and_login("bo").await;
    let song = app.seed("song.mp3", false, &[]).await;
    let id = playlist_with(&app, &ana, &[song.id]).await;

    let (status, _) = app.get(&format!("/api/playlists/{}", id), &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/api/playlists/{}", id), &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post_empty(&format!("/api/player/start/{}", id), &bo).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listing) = app.get("/api/playlists", &bo).await;
    assert!(ids(&listing).is_empty());
}

#[tokio::test]
async fn test_adding_present_item_is_noop() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let song = app.seed("song.mp3", false, &[]).await;
    let id = playlist_with(&app, &cookie, &[song.id, song.id]).await;

    let (_, body) = app.get(&format!("/api/playlists/{}", id), &cookie).await;
    assert_eq!(ids(&body["items"]), vec![song.id]);

    let (status, _) = app
        .post(&format!("/api/playlists/{}/items", id), &cookie, json!({ "fileId": 999 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .delete(&format!("/api/playlists/{}/items/{}", id, song.id), &cookie)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body["items"]).is_empty());

    let (status, _) = app
        .delete(&format!("/api/playlists/{}/items/{}", id, song.id), &cookie)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_item_needs_grant_to_add() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let secret = app.seed("secret.mp3", true, &[]).await;
    let id = playlist_with(&app, &cookie, &[]).await;

    let (status, _) = app
        .post(&format!("/api/playlists/{}/items", id), &cookie, json!({ "fileId": secret.id }))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_player_transport_wraps() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let a = app.seed("a.mp3", false, &[]).await;
    let b = app.seed("b.mp3", false, &[]).await;
    let c = app.seed("c.mp3", false, &[]).await;
    let id = playlist_with(&app, &cookie, &[a.id, b.id, c.id]).await;

    let (_, idle) = app.get("/api/player", &cookie).await;
    assert_eq!(idle["active"], false);

    let (status, player) = app.post_empty(&format!("/api/player/start/{}", id), &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["active"], true);
    assert_eq!(player["playlistName"], "Road trip");
    assert_eq!(player["mode"], "normal");
    assert_eq!(queue(&player), vec![a.id, b.id, c.id]);
    assert_eq!(player["current"]["id"], a.id);

    app.post_empty("/api/player/next", &cookie).await;
    app.post_empty("/api/player/next", &cookie).await;
    let (_, player) = app.post_empty("/api/player/next", &cookie).await;
    assert_eq!(player["current"]["id"], a.id);

    let (_, player) = app.post_empty("/api/player/previous", &cookie).await;
    assert_eq!(player["current"]["id"], c.id);

    let (_, player) = app.get("/api/player", &cookie).await;
    assert_eq!(player["current"]["id"], c.id);
}

#[tokio::test]
async fn test_player_requires_started_playlist() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let empty = playlist_with(&app, &cookie, &[]).await;

    let (status, _) = app.post_empty("/api/player/next", &cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post_empty("/api/player/shuffle", &cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post_empty(&format!("/api/player/start/{}", empty), &cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    let (_, player) = app.get("/api/player", &cookie).await;
    assert_eq!(player["active"], false);
}

#[tokio::test]
async fn test_start_skips_items_caller_cannot_see() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let public = app.seed("a.mp3", false, &[]).await;
    let secret = app.seed("b.mp3", true, &[]).await;

    app.unlock(&cookie).await;
    let id = playlist_with(&app, &cookie, &[secret.id, public.id]).await;
    app.post_empty("/api/private/lock", &cookie).await;

    let (_, player) = app.post_empty(&format!("/api/player/start/{}", id), &cookie).await;
    assert_eq!(queue(&player), vec![public.id]);
}

#[tokio::test]
async fn test_shuffle_keeps_current_first() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let mut file_ids = Vec::new();
    for i in 0..6 {
        file_ids.push(app.seed(&format!("track{}.mp3", i), false, &[]).await.id);
    }
    let id = playlist_with(&app, &cookie, &file_ids).await;
    app.post_empty(&format!("/api/player/start/{}", id), &cookie).await;
    app.post_empty("/api/player/next", &cookie).await;

    let (_, player) = app.post_empty("/api/player/shuffle", &cookie).await;
    assert_eq!(player["mode"], "shuffled");
    let shuffled = queue(&player);
    assert_eq!(shuffled[0], file_ids[1]);
    let mut sorted = shuffled.clone();
    sorted.sort();
    let mut expected = file_ids.clone();
    expected.sort();
    assert_eq!(sorted, expected);

    // Turning shuffle off follows the playlist as it is now
    app.delete(&format!("/api/playlists/{}/items/{}", id, file_ids[5]), &cookie)
        .await;
    let (_, player) = app.post_empty("/api/player/shuffle", &cookie).await;
    assert_eq!(player["mode"], "normal");
    assert_eq!(player["current"]["id"], file_ids[1]);
    assert_eq!(
        queue(&player),
        vec![file_ids[1], file_ids[0], file_ids[2], file_ids[3], file_ids[4]]
    );
}

#[tokio::test]
async fn test_adhoc_queue() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let a = app.seed("a.mp3", false, &[]).await;
    let b = app.seed("b.mp3", false, &[]).await;

    let (status, body) = app.post_empty(&format!("/api/queue/{}", a.id), &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], true);
    let (_, body) = app.post_empty(&format!("/api/queue/{}", a.id), &cookie).await;
    assert_eq!(body["queued"], false);
    assert_eq!(body["count"], 1);
    app.post_empty(&format!("/api/queue/{}", b.id), &cookie).await;

    let (_, body) = app.get("/api/queue", &cookie).await;
    assert_eq!(ids(&body["items"]), vec![a.id, b.id]);

    let (status, body) = app.get("/api/queue/play/1", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["id"], b.id);
    assert_eq!(body["total"], 2);

    let (status, _) = app.get("/api/queue/play/5", &cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.delete(&format!("/api/queue/{}", a.id), &cookie).await;
    assert_eq!(body["removed"], true);
    assert_eq!(body["count"], 1);

    let (_, body) = app.post_empty("/api/queue/clear", &cookie).await;
    assert_eq!(body["count"], 0);
    let (_, body) = app.get("/api/queue", &cookie).await;
    assert!(ids(&body["items"]).is_empty());
}

#[tokio::test]
async fn test_queue_rejects_missing_and_private_items() {
    let app = TestApp::new().await;
    let cookie = app.register_and_login("ana").await;
    let secret = app.seed("secret.mp3", true, &[]).await;

    let (status, _) = app.post_empty("/api/queue/999", &cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post_empty(&format!("/api/queue/{}", secret.id), &cookie).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
