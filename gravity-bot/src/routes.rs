//! Webhook and health routes.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handler::Handler;
use crate::update::Update;

/// Updates larger than this are junk, not Bot API traffic: real Telegram
/// updates stay far below a megabyte. Oversized bodies are rejected at
/// the transport edge with 413 before they reach the webhook handler, so
/// the always-200 acknowledgement only covers payloads within this bound.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for the webhook server.
pub struct AppState {
    pub handler: Arc<Handler>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Fixed probe response for non-POST requests to the root path.
async fn probe() -> &'static str {
    "Bot is active and healthy!"
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "gravity-bot",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Webhook entry point.
///
/// Always acknowledges with 200 so the transport never redelivers the
/// update; processing runs in a detached task and any failure is reported
/// through a chat reply, never through the status code. The only requests
/// answered differently are bodies over [`MAX_BODY_BYTES`], which the
/// limit layer rejects before this handler runs.
async fn webhook(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let update = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .as_ref()
        .and_then(Update::parse);

    match update {
        Some(update) => {
            let handler = state.handler.clone();
            tokio::spawn(async move {
                handler.handle(update).await;
            });
        }
        None => tracing::debug!("ignoring unparseable update ({} bytes)", body.len()),
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

/// Build the webhook router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(probe).post(webhook))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
