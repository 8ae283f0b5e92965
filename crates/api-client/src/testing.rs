//! Scripted in-memory API for tests
//!
//! Resource paths accept exactly one bearer token (the "valid" one) and
//! answer 401 otherwise. `/auth/refresh` pops scripted replies and, on
//! success, makes the new token the valid one. A gated API holds every
//! refresh call open until the test releases it, which lets tests line up
//! exact interleavings.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, broadcast};
use transport::{ApiRequest, ApiResponse, ResponseFuture, StatusCode, Transport, TransportError};

use crate::events::SessionEvent;

pub(crate) enum RefreshReply {
    Token(&'static str),
    Rejected,
    /// 503 from the session service.
    Unavailable,
}

#[derive(Default)]
struct Script {
    valid_token: String,
    refresh_replies: VecDeque<RefreshReply>,
    replies: HashMap<String, (StatusCode, serde_json::Value)>,
    open: HashSet<String>,
    unauthorized: HashSet<String>,
    failing: HashSet<String>,
}

pub(crate) struct MockApi {
    script: Mutex<Script>,
    requests: Mutex<Vec<ApiRequest>>,
    refresh_calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl MockApi {
    pub(crate) fn new(valid_token: &str) -> Arc<Self> {
        Arc::new(Self::build(valid_token, None))
    }

    /// Refresh calls block until `release_refresh`.
    pub(crate) fn gated(valid_token: &str) -> Arc<Self> {
        Arc::new(Self::build(valid_token, Some(Semaphore::new(0))))
    }

    fn build(valid_token: &str, gate: Option<Semaphore>) -> Self {
        Self {
            script: Mutex::new(Script {
                valid_token: valid_token.to_string(),
                ..Script::default()
            }),
            requests: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
            gate,
        }
    }

    pub(crate) fn push_refresh(&self, reply: RefreshReply) {
        self.script.lock().unwrap().refresh_replies.push_back(reply);
    }

    /// Canned reply for an authorized request to `path`.
    pub(crate) fn reply(&self, path: &str, status: StatusCode, body: serde_json::Value) {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(path.to_string(), (status, body));
    }

    /// `path` answers without checking the token.
    pub(crate) fn open(&self, path: &str) {
        self.script.lock().unwrap().open.insert(path.to_string());
    }

    /// `path` answers 401 whatever token is sent.
    pub(crate) fn always_unauthorized(&self, path: &str) {
        self.script.lock().unwrap().unauthorized.insert(path.to_string());
    }

    /// `path` fails with a connection error.
    pub(crate) fn fail(&self, path: &str) {
        self.script.lock().unwrap().failing.insert(path.to_string());
    }

    pub(crate) fn release_refresh(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, request: ApiRequest) -> transport::Result<ApiResponse> {
        let path = request.path().to_string();
        self.requests.lock().unwrap().push(request.clone());

        let failing = self.script.lock().unwrap().failing.contains(&path);
        if failing {
            return Err(TransportError::Connect("connection refused".into()));
        }

        if session::is_refresh_endpoint(&path) {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let mut script = self.script.lock().unwrap();
            return Ok(match script.refresh_replies.pop_front() {
                Some(RefreshReply::Token(token)) => {
                    script.valid_token = token.to_string();
                    ApiResponse::from_json(
                        StatusCode::OK,
                        &serde_json::json!({ "success": true, "accessToken": token }),
                    )
                }
                Some(RefreshReply::Unavailable) => ApiResponse::from_json(
                    StatusCode::SERVICE_UNAVAILABLE,
                    &serde_json::json!({ "message": "Service unavailable" }),
                ),
                Some(RefreshReply::Rejected) | None => ApiResponse::from_json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "message": "Invalid refresh token" }),
                ),
            });
        }

        let script = self.script.lock().unwrap();
        if script.unauthorized.contains(&path) {
            return Ok(expired());
        }

        let public = path.starts_with("/auth/") || script.open.contains(&path);
        if !public && request.bearer_token() != Some(script.valid_token.as_str()) {
            return Ok(expired());
        }

        Ok(match script.replies.get(&path) {
            Some((status, body)) => ApiResponse::from_json(*status, body),
            None => ApiResponse::from_json(
                StatusCode::OK,
                &serde_json::json!({ "path": path, "token": request.bearer_token() }),
            ),
        })
    }
}

fn expired() -> ApiResponse {
    ApiResponse::from_json(
        StatusCode::UNAUTHORIZED,
        &serde_json::json!({ "message": "Token expired" }),
    )
}

impl Transport for MockApi {
    fn id(&self) -> &str {
        "mock"
    }

    fn execute<'a>(&'a self, request: &'a ApiRequest) -> ResponseFuture<'a> {
        Box::pin(self.respond(request.clone()))
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

/// Drain every event broadcast so far.
pub(crate) fn collect_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Build an unsigned JWT carrying `payload`.
pub(crate) fn jwt(payload: &serde_json::Value) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
