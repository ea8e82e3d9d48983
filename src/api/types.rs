//! API request and response types

use crate::llm::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat`.
///
/// `message` stays untyped so that a missing, null or non-string value is
/// reported as a validation error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<Value>,
}

/// One side of an exchange as echoed back to the client
#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub role: Role,
    pub message: String,
}

/// Response for a successful chat exchange
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub user_message: MessagePayload,
    pub model_message: MessagePayload,
}

impl ChatReply {
    pub fn new(user: String, model: String) -> Self {
        Self {
            user_message: MessagePayload {
                role: Role::User,
                message: user,
            },
            model_message: MessagePayload {
                role: Role::Model,
                message: model,
            },
        }
    }
}

/// Response for `GET /health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub history_turns: usize,
    pub seed: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
