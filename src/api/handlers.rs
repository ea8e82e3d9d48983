//! HTTP request handlers

use super::types::{ChatReply, ChatRequest, ErrorResponse, HealthResponse};
use super::AppState;
use crate::llm::LlmError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::services::ServeDir;

const EMPTY_MESSAGE: &str = "Message cannot be empty.";
const UPSTREAM_FAILURE: &str = "Failed to get response from AI model";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(state.static_dir.as_path());

    Router::new()
        // Landing page
        .route("/", get(serve_index))
        .route("/chat", post(chat))
        .route("/health", get(health))
        // Everything else resolves against the static directory
        .fallback_service(assets)
        .with_state(state)
}

// ============================================================
// Landing Page
// ============================================================

async fn serve_index(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::read_to_string(state.static_dir.join("index.html")).await {
        Ok(content) => Html(content).into_response(),
        Err(e) => {
            tracing::warn!(dir = %state.static_dir.display(), error = %e, "index.html unavailable");
            (
                StatusCode::NOT_FOUND,
                Html("<h1>404 - index.html not found</h1>".to_string()),
            )
                .into_response()
        }
    }
}

// ============================================================
// Chat
// ============================================================

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, AppError> {
    let message = validate_message(&body).inspect_err(|_| {
        tracing::warn!("Rejected chat request with empty or invalid message");
    })?;

    tracing::info!(chars = message.chars().count(), "Sending message to model");
    let reply = state
        .session
        .send_message(&message)
        .await
        .map_err(AppError::Upstream)?;

    Ok(Json(ChatReply::new(message, reply)))
}

/// Extract a usable message from a raw `POST /chat` body.
///
/// The message is returned as sent; trimming only decides emptiness.
fn validate_message(body: &[u8]) -> Result<String, AppError> {
    let request: ChatRequest = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest(EMPTY_MESSAGE.to_string()))?;

    match request.message {
        Some(Value::String(message)) if !message.trim().is_empty() => Ok(message),
        _ => Err(AppError::BadRequest(EMPTY_MESSAGE.to_string())),
    }
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.session.model_id().to_string(),
        history_turns: state.session.len(),
        seed: state.seed_status.label(),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Upstream(LlmError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(e) => {
                tracing::error!(kind = e.kind.as_str(), error = %e, "Error generating response from model");
                (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE.to_string())
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
