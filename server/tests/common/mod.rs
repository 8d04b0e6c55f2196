//! Router harness for HTTP tests: temp data root, in-memory database and
//! a toolchain that writes placeholder files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt as _;

use contenthub::media::{MediaToolchain, StreamSelection, ToolFailure};
use contenthub::{Database, MediaStorage, SourceRepository, SqliteSourceRepository};
use contenthub_server::{router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Default)]
pub struct FakeToolchain {
    pub fail_download: AtomicBool,
    pub download_delay_ms: AtomicU64,
}

#[async_trait]
impl MediaToolchain for FakeToolchain {
    async fn download(&self, _url: &str, destination: &Path) -> Result<(), ToolFailure> {
        let delay = self.download_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(ToolFailure::new("ERROR: Video unavailable"));
        }
        std::fs::write(destination, b"combined").map_err(|e| ToolFailure::new(e.to_string()))
    }

    async fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        _selection: StreamSelection,
    ) -> Result<(), ToolFailure> {
        std::fs::write(output, b"derived").map_err(|e| ToolFailure::new(e.to_string()))
    }
}

pub struct TestApp {
    _temp_dir: TempDir,
    pub data_home: PathBuf,
    pub toolchain: Arc<FakeToolchain>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let data_home = temp_dir.path().join("data");
        let repo: Arc<dyn SourceRepository> = Arc::new(SqliteSourceRepository::new(
            Database::open_in_memory().expect("in-memory db"),
        ));
        let toolchain = Arc::new(FakeToolchain::default());
        let state = Arc::new(AppState::new(
            repo,
            MediaStorage::new(&data_home),
            Arc::clone(&toolchain) as Arc<dyn MediaToolchain>,
            Duration::from_secs(10),
        ));
        Self {
            _temp_dir: temp_dir,
            data_home,
            toolchain,
            state,
        }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router().oneshot(req).await.expect("oneshot")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("build GET");
        read_json(self.send(req).await).await
    }

    pub async fn send_json(&self, method: &str, uri: &str, payload: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("build JSON request");
        read_json(self.send(req).await).await
    }

    pub async fn create_source(&self, url: &str) -> String {
        let (status, body) = self
            .send_json(
                "POST",
                "/sources",
                serde_json::json!({ "title": "Evening news", "url": url, "source_type": "video" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["source_id"].as_str().expect("source_id").to_string()
    }
}

pub async fn read_bytes(resp: Response<Body>) -> Vec<u8> {
    body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn read_json(resp: Response<Body>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = read_bytes(resp).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
