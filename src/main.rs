//! DSA Dost - a Data Structures & Algorithms tutor chat service
//!
//! Serves a single chat widget backed by a Gemini model, and exports the
//! rendered conversation as a PDF.

// Test-only accessors are `#[cfg(test)]`; nothing else may go unused
#![cfg_attr(not(test), deny(dead_code, unused_imports))]

mod api;
mod chat;
mod config;
mod export;
mod llm;
mod render;
mod system_prompt;
mod transcript;

use api::{create_router, AppState};
use chat::{ChatSession, ExchangeSettings};
use config::AppConfig;
use export::BodyFont;
use llm::ModelRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dsa_dost=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;
    let system_prompt = system_prompt::build_system_prompt(config.system_prompt_file.as_deref())?;

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    let Some(llm) = llm_registry.default() else {
        tracing::error!(
            requested = %llm_registry.default_model_id(),
            available = ?llm_registry.available_models(),
            "No usable model configured. Set GEMINI_API_KEY or LLM_GATEWAY."
        );
        return Err("no model configured".into());
    };
    tracing::info!(
        models = ?llm_registry.available_models(),
        default = %llm_registry.default_model_id(),
        "LLM registry initialized"
    );

    let session = Arc::new(ChatSession::new(
        llm,
        ExchangeSettings {
            system_prompt,
            max_output_tokens: config.max_output_tokens,
            timeout: config.exchange_timeout,
        },
    ));
    tracing::info!(session_id = %session.session_id(), "Chat session started");

    let export_font = config
        .pdf_font_file
        .as_deref()
        .map(BodyFont::load)
        .transpose()?;
    if export_font.is_none() {
        tracing::warn!("DSA_DOST_PDF_FONT_FILE not set; exports can only draw Latin-1 text");
    }

    let state = AppState::new(session.clone(), llm_registry, export_font);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(compression),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("DSA Dost listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            session.shutdown();
        })
        .await?;

    Ok(())
}
