//! Test utilities for voltspace-core
//!
//! This module provides a mock collaborator server that emulates both the
//! OpenAI chat-completions API and the Meshy image-to-3D API, with scripted
//! responses, for integration tests and local development.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Task id handed out by the mock submit endpoint
pub const MOCK_TASK_ID: &str = "task-123";

/// Body served for the mock GLB asset
pub const MOCK_GLB_BYTES: &[u8] = b"glTF\x02\x00\x00\x00mock-model";

/// A scripted HTTP reply
#[derive(Debug, Clone)]
struct Scripted {
    status: StatusCode,
    body: Value,
}

#[derive(Default)]
struct MockState {
    chat_replies: Mutex<VecDeque<Scripted>>,
    chat_requests: Mutex<Vec<Value>>,
    submit_reply: Mutex<Option<Scripted>>,
    submissions: Mutex<Vec<Value>>,
    authorizations: Mutex<Vec<String>>,
    task_script: Mutex<VecDeque<Value>>,
    last_task: Mutex<Option<Value>>,
    status_polls: AtomicUsize,
}

/// Mock OpenAI + Meshy server for testing and development
pub struct MockCollaboratorServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: Arc<MockState>,
}

impl MockCollaboratorServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/openapi/v1/image-to-3d", post(handle_submit))
            .route("/openapi/v1/image-to-3d/:task_id", get(handle_task))
            .route("/assets/:file", get(handle_asset))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the downloadable mock model
    pub fn glb_url(&self) -> String {
        format!("{}/assets/{}.glb", self.url(), MOCK_TASK_ID)
    }

    /// Queue a successful chat completion with this content
    pub fn push_chat_text(&self, content: &str) {
        self.push_chat(
            StatusCode::OK,
            json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion",
                "model": "mock",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }),
        );
    }

    /// Queue a failing chat completion
    pub fn push_chat_error(&self, status: u16, message: &str) {
        self.push_chat(
            StatusCode::from_u16(status).unwrap(),
            json!({"error": {"message": message}}),
        );
    }

    fn push_chat(&self, status: StatusCode, body: Value) {
        self.state
            .chat_replies
            .lock()
            .unwrap()
            .push_back(Scripted { status, body });
    }

    /// Chat completion request bodies received so far
    pub fn chat_requests(&self) -> Vec<Value> {
        self.state.chat_requests.lock().unwrap().clone()
    }

    /// Make the submit endpoint fail
    pub fn fail_submit(&self, status: u16, body: Value) {
        *self.state.submit_reply.lock().unwrap() = Some(Scripted {
            status: StatusCode::from_u16(status).unwrap(),
            body,
        });
    }

    /// Submission bodies received so far
    pub fn submissions(&self) -> Vec<Value> {
        self.state.submissions.lock().unwrap().clone()
    }

    /// Authorization headers seen on Meshy endpoints
    pub fn authorizations(&self) -> Vec<String> {
        self.state.authorizations.lock().unwrap().clone()
    }

    /// Queue a task status payload; the last one repeats once the queue drains
    pub fn push_task_payload(&self, payload: Value) {
        self.state.task_script.lock().unwrap().push_back(payload);
    }

    /// Queue a status without a model
    pub fn push_task_status(&self, status: &str) {
        self.push_task_payload(json!({"id": MOCK_TASK_ID, "status": status, "progress": 50}));
    }

    /// Queue a successful status pointing at the mock model
    pub fn push_task_succeeded(&self) {
        self.push_task_payload(json!({
            "id": MOCK_TASK_ID,
            "status": "SUCCEEDED",
            "progress": 100,
            "model_urls": {"glb": self.glb_url()}
        }));
    }

    /// Number of status polls served
    pub fn status_polls(&self) -> usize {
        self.state.status_polls.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockCollaboratorServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record_auth(state: &MockState, headers: &HeaderMap) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.authorizations.lock().unwrap().push(auth);
}

/// Models listing (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "gpt-4o-mini", "object": "model"}]}))
}

/// Chat completions endpoint; unscripted calls get empty content
async fn handle_chat(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.chat_requests.lock().unwrap().push(body);
    let reply = state.chat_replies.lock().unwrap().pop_front();
    match reply {
        Some(Scripted { status, body }) => (status, Json(body)).into_response(),
        None => Json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": ""}}]
        }))
        .into_response(),
    }
}

/// Task submission
async fn handle_submit(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    state.submissions.lock().unwrap().push(body);
    match state.submit_reply.lock().unwrap().clone() {
        Some(Scripted { status, body }) => (status, Json(body)).into_response(),
        None => Json(json!({"result": MOCK_TASK_ID})).into_response(),
    }
}

/// Task status; unknown ids are 404
async fn handle_task(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Response {
    record_auth(&state, &headers);
    state.status_polls.fetch_add(1, Ordering::SeqCst);

    if task_id != MOCK_TASK_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"message": format!("Task not found: {}", task_id)})),
        )
            .into_response();
    }

    let next = state.task_script.lock().unwrap().pop_front();
    let payload = {
        let mut last = state.last_task.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| json!({"id": MOCK_TASK_ID, "status": "PENDING", "progress": 0}))
    };
    Json(payload).into_response()
}

/// Model download
async fn handle_asset(Path(file): Path<String>) -> Response {
    if file != format!("{}.glb", MOCK_TASK_ID) {
        return (StatusCode::NOT_FOUND, "asset not found").into_response();
    }
    Response::builder()
        .header(header::CONTENT_TYPE, "model/gltf-binary")
        .body(Body::from(MOCK_GLB_BYTES))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockCollaboratorServer::start().await;
        let resp = reqwest::get(format!("{}/v1/models", server.url()))
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_task_script_repeats_last() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_status("IN_PROGRESS");

        let url = format!("{}/openapi/v1/image-to-3d/{}", server.url(), MOCK_TASK_ID);
        for _ in 0..2 {
            let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
            assert_eq!(body["status"], "IN_PROGRESS");
        }
        assert_eq!(server.status_polls(), 2);
    }
}
