//! Local stand-in for the ad platform's Graph endpoints.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SESSION_ID: &str = "sess-42";
pub const VIDEO_ID: &str = "vid-7";
pub const IMAGE_HASH: &str = "img-hash-1";

/// Request the stub should refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    Image,
    Start,
    Transfer,
    Finish,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn body_contains(&self, needle: &[u8]) -> bool {
        !needle.is_empty() && self.body.windows(needle.len()).any(|w| w == needle)
    }
}

struct StubState {
    base_url: String,
    reject: Mutex<Option<Reject>>,
    bare_image_response: AtomicBool,
    requests: Mutex<Vec<Recorded>>,
}

pub struct PlatformStub {
    pub addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl PlatformStub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(StubState {
            base_url: format!("http://{}", addr),
            reject: Mutex::new(None),
            bare_image_response: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(handle)
            .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state, handle }
    }

    pub fn base_url(&self) -> String {
        self.state.base_url.clone()
    }

    pub fn reject(&self, phase: Reject) {
        *self.state.reject.lock().unwrap() = Some(phase);
    }

    pub fn accept_all(&self) {
        *self.state.reject.lock().unwrap() = None;
    }

    /// Accept images with a body that names no hash.
    pub fn omit_image_hash(&self) {
        self.state.bare_image_response.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    /// Config pointing the crate at this stub.
    pub fn config_toml(&self, failure_policy: &str) -> String {
        format!(
            r#"
            [platform]
            graph_url = "{}"
            api_version = "v20.0"
            ad_account_id = "123"
            access_token = "test-token"

            [queue]
            failure_policy = "{}"

            [http]
            timeout_secs = 30
            "#,
            self.base_url(),
            failure_policy,
        )
    }
}

impl Drop for PlatformStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

fn graph_error(message: &str) -> Response {
    let body = json!({"error": {"message": message, "type": "OAuthException", "code": 100}});
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn handle(State(state): State<Arc<StubState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_string();
    let recorded = Recorded {
        path: path.clone(),
        content_type: header(&headers, "content-type"),
        content_length: header(&headers, "content-length"),
        authorization: header(&headers, "authorization"),
        body: body.clone(),
    };
    state.requests.lock().unwrap().push(recorded);

    let reject = *state.reject.lock().unwrap();

    if path == "/v20.0/act_123/adimages" {
        if reject == Some(Reject::Image) {
            return graph_error("Invalid image file");
        }
        if state.bare_image_response.load(Ordering::SeqCst) {
            return Json(json!({"images": {}})).into_response();
        }
        let body = json!({"images": {"photo.jpg": {"hash": IMAGE_HASH, "url": "https://cdn.example/photo.jpg"}}});
        return Json(body).into_response();
    }

    if path == "/v20.0/act_123/advideos" {
        let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        return match request["upload_phase"].as_str() {
            Some("start") if reject == Some(Reject::Start) => graph_error("Invalid OAuth access token."),
            Some("start") => Json(json!({
                "upload_session_id": SESSION_ID,
                "upload_url": format!("{}/upload/{}", state.base_url, SESSION_ID),
                "video_id": VIDEO_ID,
            }))
            .into_response(),
            Some("finish") if reject == Some(Reject::Finish) => graph_error("Upload session expired"),
            Some("finish") => Json(json!({"success": true})).into_response(),
            _ => graph_error("Unknown upload phase"),
        };
    }

    if path == format!("/upload/{}", SESSION_ID) {
        if reject == Some(Reject::Transfer) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "transfer refused").into_response();
        }
        return Json(json!({"success": true})).into_response();
    }

    (StatusCode::NOT_FOUND, "no such route").into_response()
}
