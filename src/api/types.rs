//! API request and response types

use crate::llm::ModelInfo;
use crate::transcript::RenderedMessage;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Outcome of a chat submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Replied,
    Ignored,
    /// The apology was rendered instead of a reply
    Failed,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub status: ChatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_html: Option<String>,
}

/// Current display surface
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub messages: Vec<RenderedMessage>,
    pub send_enabled: bool,
}

/// Response with available models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
    /// Model the chat session talks to
    pub active: String,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
