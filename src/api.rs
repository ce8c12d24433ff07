//! HTTP API for the chat widget

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::chat::ChatSession;
use crate::export::BodyFont;
use crate::llm::ModelRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ChatSession>,
    pub llm_registry: Arc<ModelRegistry>,
    /// Embedded for exported message text when configured
    pub export_font: Option<Arc<BodyFont>>,
}

impl AppState {
    pub fn new(
        session: Arc<ChatSession>,
        llm_registry: Arc<ModelRegistry>,
        export_font: Option<BodyFont>,
    ) -> Self {
        Self {
            session,
            llm_registry,
            export_font: export_font.map(Arc::new),
        }
    }
}
