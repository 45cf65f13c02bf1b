//! Test utilities for spendings-core
//!
//! Provides a mock Telegram Bot API server that the real [`TelegramGateway`]
//! can talk to in integration tests.
//!
//! [`TelegramGateway`]: crate::gateway::TelegramGateway

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Bot token the mock server accepts
pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Default)]
struct ServerState {
    /// Unacknowledged updates, oldest first
    updates: Vec<Value>,
    /// `(chat_id, text)` of every sendMessage call
    sent: Vec<(i64, String)>,
    next_sent_id: i64,
    fail_send: bool,
}

type SharedState = Arc<Mutex<ServerState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ServerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock Telegram Bot API server for testing
pub struct MockTelegramServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockTelegramServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = SharedState::default();
        let app = Router::new()
            .route("/:bot/:method", post(handle_method))
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
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL to use as the API base
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a new text message
    pub fn push_text_message(&self, update_id: i64, message_id: i64, chat_id: i64, text: &str) {
        self.push_update(json!({
            "update_id": update_id,
            "message": message_json(message_id, chat_id, Some(text)),
        }));
    }

    /// Queue an edit of an earlier message
    pub fn push_edited_message(&self, update_id: i64, message_id: i64, chat_id: i64, text: &str) {
        self.push_update(json!({
            "update_id": update_id,
            "edited_message": message_json(message_id, chat_id, Some(text)),
        }));
    }

    /// Queue a message that has no text (e.g. a sticker)
    pub fn push_non_text_message(&self, update_id: i64, message_id: i64, chat_id: i64) {
        self.push_update(json!({
            "update_id": update_id,
            "message": message_json(message_id, chat_id, None),
        }));
    }

    /// Queue a raw update object
    pub fn push_update(&self, update: Value) {
        lock(&self.state).updates.push(update);
    }

    /// `(chat_id, text)` of every message the bot sent
    pub fn sent_messages(&self) -> Vec<(i64, String)> {
        lock(&self.state).sent.clone()
    }

    /// Ids of updates not yet acknowledged
    pub fn pending_update_ids(&self) -> Vec<i64> {
        lock(&self.state)
            .updates
            .iter()
            .filter_map(|u| u["update_id"].as_i64())
            .collect()
    }

    /// Make sendMessage answer with `ok: false`
    pub fn set_fail_send(&self, fail: bool) {
        lock(&self.state).fail_send = fail;
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockTelegramServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn message_json(message_id: i64, chat_id: i64, text: Option<&str>) -> Value {
    let mut message = json!({
        "message_id": message_id,
        "date": 1_715_000_000,
        "chat": { "id": chat_id, "type": "private" },
    });
    if let Some(text) = text {
        message["text"] = json!(text);
    }
    message
}

fn api_error(status: StatusCode, description: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "ok": false,
            "error_code": status.as_u16(),
            "description": description,
        })),
    )
}

async fn handle_method(
    State(state): State<SharedState>,
    Path((bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if bot != format!("bot{}", TEST_TOKEN) {
        return api_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match method.as_str() {
        "getUpdates" => handle_get_updates(&state, &body),
        "sendMessage" => handle_send_message(&state, &body),
        _ => api_error(StatusCode::NOT_FOUND, "Not Found: method not found"),
    }
}

/// Acknowledges everything below `offset`, then returns up to `limit` updates
fn handle_get_updates(state: &SharedState, body: &Value) -> (StatusCode, Json<Value>) {
    let mut state = lock(state);

    if let Some(offset) = body["offset"].as_i64() {
        state
            .updates
            .retain(|u| u["update_id"].as_i64().unwrap_or(i64::MIN) >= offset);
    }

    let limit = body["limit"].as_u64().unwrap_or(100) as usize;
    let result: Vec<Value> = state.updates.iter().take(limit).cloned().collect();

    (StatusCode::OK, Json(json!({ "ok": true, "result": result })))
}

fn handle_send_message(state: &SharedState, body: &Value) -> (StatusCode, Json<Value>) {
    let mut state = lock(state);

    if state.fail_send {
        return api_error(StatusCode::FORBIDDEN, "Forbidden: bot was blocked by the user");
    }

    let (Some(chat_id), Some(text)) = (body["chat_id"].as_i64(), body["text"].as_str()) else {
        return api_error(StatusCode::BAD_REQUEST, "Bad Request: chat_id and text are required");
    };

    state.sent.push((chat_id, text.to_string()));
    state.next_sent_id += 1;
    let message = message_json(10_000 + state.next_sent_id, chat_id, Some(text));

    (StatusCode::OK, Json(json!({ "ok": true, "result": message })))
}
