//! Google Gemini provider implementation

use super::types::{FinishReason, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DIRECT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    Gemini20Flash,
    Gemini25Flash,
    Gemini25Pro,
}

impl GeminiModel {
    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Gemini20Flash => "gemini-2.0-flash",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
            GeminiModel::Gemini25Pro => "gemini-2.5-pro",
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: GeminiModel,
    url: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: GeminiModel, gateway: Option<&str>) -> Result<Self, LlmError> {
        let url = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{}:generateContent",
                gw.trim_end_matches('/'),
                model.api_name()
            ),
            None => format!(
                "{DIRECT_BASE_URL}/v1beta/models/{}:generateContent",
                model.api_name()
            ),
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            url,
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(
                    request
                        .system
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                )],
            })
        };

        let contents = request
            .messages
            .iter()
            .filter(|msg| !msg.text.is_empty())
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Model => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart::text(msg.text.clone())],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: max,
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::malformed(format!("No reply from model: {reason}")));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text)
            .collect();

        let finish_reason = candidate.finish_reason.as_deref().map(FinishReason::from_wire);

        if text.trim().is_empty() {
            return Err(LlmError::malformed(format!(
                "Empty reply (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("none")
            )));
        }

        let usage = resp.usage_metadata.unwrap_or_default();

        Ok(LlmResponse {
            text,
            finish_reason,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let mut builder = self.client.post(&self.url).json(&gemini_request);
        if !self.api_key.starts_with("implicit") {
            // Key travels in a header, never in the URL
            builder = builder.header("x-goog-api-key", &self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                LlmError::network(format!("Connection failed: {e}"))
            } else {
                LlmError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::malformed(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}


#[cfg(test)]
mod tests {
    use super::test_helpers::{normalize_json, request_json};
    use super::*;
    use crate::llm::error::LlmErrorKind;
    use crate::llm::{LlmMessage, SystemContent};
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn sample_request() -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::new("You are DSA Dost.")],
            messages: vec![
                LlmMessage::user("What is a stack?"),
                LlmMessage::model("A LIFO structure."),
                LlmMessage::user("Example chahiye"),
            ],
            max_tokens: Some(500),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let body = request_json(&sample_request());

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are DSA Dost."
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Example chahiye");
    }

    #[test]
    fn test_request_without_system_or_bound() {
        let body = request_json(&LlmRequest {
            system: vec![],
            messages: vec![LlmMessage::user("hi")],
            max_tokens: None,
        });
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_normalize_joins_parts_and_skips_thoughts() {
        let resp = normalize_json(&json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "A stack is "},
                        {"text": "LIFO."}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16}
        }))
        .unwrap();

        assert_eq!(resp.text, "A stack is LIFO.");
        assert_eq!(resp.finish_reason, Some(FinishReason::Stop));
        assert_eq!(resp.usage.input_tokens, 12);
        assert_eq!(resp.usage.output_tokens, 4);
        assert!(!resp.truncated());
    }

    #[test]
    fn test_normalize_reports_truncation() {
        let resp = normalize_json(&json!({
            "candidates": [{
                "content": {"parts": [{"text": "partial"}]},
                "finishReason": "MAX_TOKENS"
            }]
        }))
        .unwrap();
        assert!(resp.truncated());
    }

    #[test]
    fn test_normalize_rejects_blocked_prompt() {
        let err = normalize_json(&json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::MalformedResponse);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_normalize_rejects_empty_candidate() {
        let err = normalize_json(&json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::MalformedResponse);
    }

    /// Serve a canned generateContent endpoint on an ephemeral port
    async fn spawn_fake_gemini(status: StatusCode, reply: Value) -> String {
        let app = Router::new().route(
            "/gemini/v1beta/models/:call",
            post(move |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(call, "gemini-2.0-flash:generateContent");
                    assert!(headers.get("x-goog-api-key").is_none());
                    assert!(body["contents"].is_array());
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_complete_against_gateway() {
        let gateway = spawn_fake_gemini(
            StatusCode::OK,
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Mast question!"}]},
                    "finishReason": "STOP"
                }]
            }),
        )
        .await;

        let service =
            GeminiService::new("implicit".to_string(), GeminiModel::Gemini20Flash, Some(&gateway))
                .unwrap();
        let resp = service.complete(&sample_request()).await.unwrap();
        assert_eq!(resp.text, "Mast question!");
        assert_eq!(service.model_id(), "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let gateway = spawn_fake_gemini(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}),
        )
        .await;

        let service =
            GeminiService::new("implicit".to_string(), GeminiModel::Gemini20Flash, Some(&gateway))
                .unwrap();
        let err = service.complete(&sample_request()).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert!(err.message.contains("quota"));
    }
}
