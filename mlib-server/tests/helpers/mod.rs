//! Shared integration test harness
//!
//! Builds the full router over a temporary root folder, with a recording
//! fake in place of the external media tools.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mlib_common::config::{ServiceConfig, StorageLayout};
use mlib_common::db::FileRecord;
use mlib_server::ingest::{self, CodecReport, ConversionError, MediaConverter, UploadOptions, UploadedFile};
use mlib_server::AppState;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const PASSPHRASE: &str = "open sesame";
pub const PASSWORD: &str = "correct horse";

/// Converter that writes placeholder outputs and records every call
#[derive(Default)]
pub struct FakeConverter {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl FakeConverter {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following call fail as if the tool were not installed
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: &str, path: &Path) -> Result<(), ConversionError> {
        let name = path.file_name().unwrap().to_string_lossy();
        self.calls.lock().unwrap().push(format!("{}:{}", call, name));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConversionError::ToolNotFound("fake".to_string()));
        }
        Ok(())
    }

    /// Write a conversion output, refusing to replace an existing file
    fn write(dest: &Path, content: &[u8]) -> Result<(), ConversionError> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)?;
        file.write_all(content)?;
        Ok(())
    }
}

impl MediaConverter for FakeConverter {
    fn generate_thumbnail(&self, source: &Path, _mime_type: &str, dest: &Path) -> Result<(), ConversionError> {
        self.record("thumbnail", source)?;
        std::fs::write(dest, b"JPEG")?;
        Ok(())
    }

    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.record("extract_audio", video)?;
        Self::write(dest, b"ID3 audio")
    }

    fn transcode_compatible(&self, video: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.record("transcode", video)?;
        Self::write(dest, b"h264 video")
    }

    fn convert_audio_to_mp3(&self, source: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.record("to_mp3", source)?;
        Self::write(dest, b"ID3 converted")
    }

    fn convert_document_to_pdf(&self, document: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.record("to_pdf", document)?;
        Self::write(dest, b"%PDF-1.4")
    }

    fn probe_codecs(&self, path: &Path) -> Result<CodecReport, ConversionError> {
        self.record("probe", path)?;
        Ok(CodecReport::new(Some("h264".to_string()), Some("aac".to_string())))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub converter: Arc<FakeConverter>,
    router: Router,
    _root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let layout = StorageLayout::new(root.path());
        layout.ensure_dirs().unwrap();
        let pool = mlib_common::db::init_database(&layout.database_path())
            .await
            .unwrap();

        let config = ServiceConfig {
            private_passphrase: PASSPHRASE.to_string(),
            bcrypt_cost: 4,
            ..ServiceConfig::default()
        };
        let converter = Arc::new(FakeConverter::default());
        let shared: Arc<dyn MediaConverter> = converter.clone();
        let state = AppState::new(pool, config, layout, shared);
        let router = mlib_server::build_router(state.clone());

        Self {
            state,
            converter,
            router,
            _root: root,
        }
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send_raw(request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn builder(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> (StatusCode, Value) {
        self.send(Self::builder("GET", uri, Some(cookie)).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_anonymous(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Self::builder("GET", uri, None).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(&self, method: &str, uri: &str, cookie: Option<&str>, body: Value) -> (StatusCode, Value) {
        let request = Self::builder(method, uri, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        self.json("POST", uri, Some(cookie), body).await
    }

    pub async fn put(&self, uri: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        self.json("PUT", uri, Some(cookie), body).await
    }

    pub async fn post_empty(&self, uri: &str, cookie: &str) -> (StatusCode, Value) {
        self.send(Self::builder("POST", uri, Some(cookie)).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> (StatusCode, Value) {
        self.send(Self::builder("DELETE", uri, Some(cookie)).body(Body::empty()).unwrap())
            .await
    }

    /// Log in and return the `Cookie` header value for the session
    pub async fn login(&self, username: &str, password: &str) -> String {
        let request = Self::builder("POST", "/api/login", None)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap();
        let (status, headers, _) = self.send_raw(request).await;
        assert_eq!(status, StatusCode::OK, "login failed for {}", username);

        let set_cookie = headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn register_and_login(&self, username: &str) -> String {
        let (status, _) = self
            .json(
                "POST",
                "/api/register",
                None,
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(username, PASSWORD).await
    }

    /// Bootstrap the administrator (first account) and log in
    pub async fn login_admin(&self) -> String {
        mlib_server::api::auth::ensure_admin_account(&self.state, "admin", PASSWORD)
            .await
            .unwrap();
        self.login("admin", PASSWORD).await
    }

    pub async fn unlock(&self, cookie: &str) {
        let (status, _) = self
            .post("/api/private/unlock", cookie, json!({ "passphrase": PASSPHRASE }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Multipart upload of one file plus form fields
    pub async fn upload(
        &self,
        cookie: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
        fields: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let boundary = "mlib-test-boundary";
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    boundary, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Self::builder("POST", "/api/files", Some(cookie))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Store a file directly through the ingestion pipeline
    pub async fn seed(&self, file_name: &str, is_private: bool, tags: &[&str]) -> FileRecord {
        let options = UploadOptions {
            is_private,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..UploadOptions::default()
        };
        let upload = UploadedFile {
            file_name: file_name.to_string(),
            content_type: None,
            bytes: format!("content of {}", file_name).into_bytes(),
        };
        ingest::ingest_upload(&self.state.db, &self.state.layout, &self.state.converter, upload, &options)
            .await
            .unwrap()
            .file
    }
}

/// Ids of the file views in a JSON array
pub fn ids(files: &Value) -> Vec<i64> {
    files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect()
}
