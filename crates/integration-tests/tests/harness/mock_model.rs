//! Mock model backend for integration tests
//!
//! Speaks the chat completions protocol and answers per tier, keyed by
//! the `model` field of the request. Replies can be changed while the
//! mock is running.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub const CHEAP_MODEL: &str = "mock-cheap";
pub const EXPENSIVE_MODEL: &str = "mock-expensive";

pub const GOOD_REPLY: &str =
    "Take the 07:12 regional train to Annecy, then the lake ferry; you will still make the 13:00 lunch booking.";
pub const HEDGED_REPLY: &str = "I'm not sure, perhaps the lake? It's unclear, hard to say really.";

/// Canned answer for one tier
#[derive(Debug, Clone)]
pub struct Reply {
    content: String,
    completion_tokens: u32,
    status: StatusCode,
    delay: Duration,
}

impl Reply {
    pub fn text(content: &str, completion_tokens: u32) -> Self {
        Self {
            content: content.to_owned(),
            completion_tokens,
            status: StatusCode::OK,
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: StatusCode) -> Self {
        Self {
            content: String::new(),
            completion_tokens: 0,
            status,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct MockState {
    cheap: Mutex<Reply>,
    expensive: Mutex<Reply>,
    cheap_calls: AtomicU32,
    expensive_calls: AtomicU32,
}

/// Mock backend on an ephemeral port
pub struct MockModel {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockModel {
    /// Start with a good reply of 2000 completion tokens on both tiers
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            cheap: Mutex::new(Reply::text(GOOD_REPLY, 2_000)),
            expensive: Mutex::new(Reply::text(GOOD_REPLY, 2_000)),
            cheap_calls: AtomicU32::new(0),
            expensive_calls: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn set_cheap(&self, reply: Reply) {
        *self.state.cheap.lock().unwrap() = reply;
    }

    pub fn set_expensive(&self, reply: Reply) {
        *self.state.expensive.lock().unwrap() = reply;
    }

    pub fn cheap_calls(&self) -> u32 {
        self.state.cheap_calls.load(Ordering::SeqCst)
    }

    pub fn expensive_calls(&self) -> u32 {
        self.state.expensive_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockModel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    #[allow(dead_code)]
    messages: Vec<serde_json::Value>,
    #[allow(dead_code)]
    max_tokens: Option<u32>,
}

async fn handle_chat_completions(State(state): State<Arc<MockState>>, Json(req): Json<ChatCompletionRequest>) -> Response {
    let reply = match req.model.as_str() {
        CHEAP_MODEL => {
            state.cheap_calls.fetch_add(1, Ordering::SeqCst);
            state.cheap.lock().unwrap().clone()
        }
        EXPENSIVE_MODEL => {
            state.expensive_calls.fetch_add(1, Ordering::SeqCst);
            state.expensive.lock().unwrap().clone()
        }
        other => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": {"message": format!("unknown model {other}")}})),
            )
                .into_response();
        }
    };

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    if reply.status != StatusCode::OK {
        return (
            reply.status,
            Json(serde_json::json!({"error": {"message": "mock server intentional failure", "type": "server_error"}})),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": req.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply.content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 25,
            "completion_tokens": reply.completion_tokens,
            "total_tokens": 25 + reply.completion_tokens
        }
    }))
    .into_response()
}
