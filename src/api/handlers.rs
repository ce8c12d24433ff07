//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::{sse_stream, InitSnapshot};
use super::types::{
    ChatRequest, ChatResponse, ChatStatus, ErrorResponse, ModelsResponse, SuccessResponse,
    TranscriptResponse,
};
use super::AppState;
use crate::chat::Submission;
use crate::export::{export_pdf, EXPORT_FILE_NAME};
use crate::render::format_message;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat widget
        .route("/", get(serve_widget))
        .route("/assets/*path", get(serve_static))
        // Conversation
        .route("/api/chat", post(send_chat))
        .route("/api/transcript", get(get_transcript))
        .route("/api/stream", get(stream_transcript))
        .route("/api/clear", post(clear_chat))
        // Export
        .route("/api/export.pdf", get(download_pdf))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn serve_widget() -> Response {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - chat widget not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Conversation
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Detached so a closed browser tab cannot abandon a half-finished exchange
    let session = state.session.clone();
    let outcome = tokio::spawn(async move { session.submit_turn(&req.text).await })
        .await
        .map_err(|e| AppError::Internal(format!("Exchange task failed: {e}")))?;

    let response = match outcome {
        Ok(Submission::Ignored) => ChatResponse {
            status: ChatStatus::Ignored,
            reply_html: None,
        },
        Ok(Submission::Busy) => {
            return Err(AppError::Conflict(
                "A reply is still on its way".to_string(),
            ))
        }
        Ok(Submission::Replied(reply)) => ChatResponse {
            status: ChatStatus::Replied,
            reply_html: Some(format_message(&reply)),
        },
        // Already logged and apologised for on the transcript
        Err(_) => ChatResponse {
            status: ChatStatus::Failed,
            reply_html: None,
        },
    };

    Ok(Json(response))
}

async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    Json(TranscriptResponse {
        session_id: state.session.session_id().to_string(),
        messages: state.session.transcript().nodes(),
        send_enabled: state.session.send_enabled(),
    })
}

async fn stream_transcript(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before the snapshot so nothing falls between the two
    let broadcast_rx = state.session.transcript().subscribe();
    let init = InitSnapshot {
        session_id: state.session.session_id().to_string(),
        messages: state.session.transcript().nodes(),
        send_enabled: state.session.send_enabled(),
    };
    sse_stream(init, broadcast_rx)
}

async fn clear_chat(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.session.clear();
    Json(SuccessResponse { success: true })
}

// ============================================================
// Export
// ============================================================

async fn download_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let messages = state.session.transcript().messages();
    let font = state.export_font.clone();
    let pdf = tokio::task::spawn_blocking(move || {
        export_pdf(&messages, Local::now(), font.as_deref())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Export task failed: {e}")))?
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
        active: state.session.model_id().to_string(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("dsa-dost ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::{DelayedMockLlmClient, MockLlmClient};
    use crate::chat::{ChatSession, ExchangeSettings, APOLOGY};
    use crate::llm::{LlmError, LlmService, ModelRegistry};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state_with(client: Arc<dyn LlmService>) -> AppState {
        let session = ChatSession::new(
            client.clone(),
            ExchangeSettings {
                system_prompt: "tutor".to_string(),
                max_output_tokens: 500,
                timeout: Duration::from_secs(5),
            },
        );
        AppState::new(
            Arc::new(session),
            Arc::new(ModelRegistry::with_service(client)),
            None,
        )
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), disposition)
    }

    fn post_chat(text: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "text": text }).to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let client = Arc::new(MockLlmClient::new("mock"));
        client.queue_reply("A *queue* is FIFO.");
        let router = create_router(state_with(client));

        let (status, body, _) = send(router.clone(), post_chat("What is a queue?")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "replied");
        assert_eq!(body["reply_html"], "A <em>queue</em> is FIFO.");

        let (_, body, _) = send(router, get_request("/api/transcript")).await;
        let body = json(&body);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["author"], "user");
        assert_eq!(messages[2]["author"], "bot");
        assert_eq!(body["send_enabled"], true);
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_chat_ignored() {
        let router = create_router(state_with(Arc::new(MockLlmClient::new("mock"))));
        let (status, body, _) = send(router, post_chat("   ")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "ignored");
        assert!(body.get("reply_html").is_none());
    }

    #[tokio::test]
    async fn test_failed_chat_reports_failure() {
        let client = Arc::new(MockLlmClient::new("mock"));
        client.queue_error(LlmError::network("connection reset"));
        let state = state_with(client);
        let router = create_router(state.clone());

        let (status, body, _) = send(router, post_chat("What is a trie?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "failed");

        let last = state.session.transcript().messages().pop().unwrap();
        assert_eq!(last.html, format_message(APOLOGY));
    }

    #[tokio::test]
    async fn test_busy_chat_conflicts() {
        let client = Arc::new(DelayedMockLlmClient::new("mock", Duration::from_millis(200)));
        client.queue_reply("LIFO");
        let started = client.request_started.clone();
        let router = create_router(state_with(client));

        let first = tokio::spawn(send(router.clone(), post_chat("stack?")));
        started.notified().await;

        let (status, body, _) = send(router, post_chat("queue?")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json(&body)["error"].is_string());

        let (status, _, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clear_resets_to_greeting() {
        let client = Arc::new(MockLlmClient::new("mock"));
        client.queue_reply("LIFO");
        let state = state_with(client);
        let router = create_router(state.clone());

        send(router.clone(), post_chat("stack?")).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/clear")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);

        assert!(state.session.history().is_empty());
        assert_eq!(state.session.transcript().messages().len(), 1);
    }

    #[tokio::test]
    async fn test_export_is_pdf_attachment() {
        let client = Arc::new(MockLlmClient::new("mock"));
        client.queue_reply("Merge sort is O(n log n).");
        let state = state_with(client);
        let router = create_router(state.clone());
        send(router.clone(), post_chat("merge sort?")).await;

        let (status, body, disposition) = send(router, get_request("/api/export.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));
        assert_eq!(
            disposition.as_deref(),
            Some("attachment; filename=\"dsa-chat.pdf\"")
        );
    }

    #[tokio::test]
    async fn test_export_embeds_configured_font() {
        let client = Arc::new(MockLlmClient::new("mock"));
        client.queue_reply("Stack ek LIFO structure hai: स्टैक");
        let font = crate::export::test_fonts::devanagari();
        let state = AppState {
            export_font: Some(Arc::new(font.clone())),
            ..state_with(client)
        };
        let router = create_router(state);
        send(router.clone(), post_chat("stack kya hai?")).await;

        let (status, body, _) = send(router, get_request("/api/export.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.windows(font.bytes().len()).any(|w| w == font.bytes()));
    }

    #[tokio::test]
    async fn test_models_and_version() {
        let router = create_router(state_with(Arc::new(MockLlmClient::new("mock"))));

        let (_, body, _) = send(router.clone(), get_request("/api/models")).await;
        let body = json(&body);
        assert_eq!(body["default"], "mock");
        assert_eq!(body["active"], "mock");

        let (status, body, _) = send(router, get_request("/version")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().starts_with("dsa-dost "));
    }

    #[tokio::test]
    async fn test_missing_asset_is_404() {
        let router = create_router(state_with(Arc::new(MockLlmClient::new("mock"))));
        let (status, _, _) = send(router, get_request("/assets/nope.js")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
