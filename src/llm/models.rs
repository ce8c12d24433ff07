//! Centralized model definitions
//!
//! Every model the service can talk to is listed here with its metadata and
//! a factory, so the registry never needs provider-specific branches.

use super::gemini::{GeminiModel, GeminiService};
use super::LlmService;
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-2.0-flash")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Human-readable description
    pub description: &'static str,
    /// Context window size in tokens
    pub context_window: usize,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn gemini_factory(
    model: GeminiModel,
    api_key: &str,
    gateway: Option<&str>,
) -> Result<Arc<dyn LlmService>, String> {
    // Accept any non-empty key (including "implicit" for gateway mode)
    if api_key.is_empty() {
        return Err(format!(
            "{} requires {} or gateway",
            model.api_name(),
            Provider::Gemini.api_key_env_var()
        ));
    }
    let service = GeminiService::new(api_key.to_string(), model, gateway).map_err(|e| e.message)?;
    Ok(Arc::new(service))
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.0-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.0 Flash (fast, default tutor model)",
            context_window: 1_048_576,
            factory: |api_key, gateway| gemini_factory(GeminiModel::Gemini20Flash, api_key, gateway),
        },
        ModelDef {
            id: "gemini-2.5-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Flash (balanced performance)",
            context_window: 1_048_576,
            factory: |api_key, gateway| gemini_factory(GeminiModel::Gemini25Flash, api_key, gateway),
        },
        ModelDef {
            id: "gemini-2.5-pro",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Pro (most capable, slower)",
            context_window: 1_048_576,
            factory: |api_key, gateway| gemini_factory(GeminiModel::Gemini25Pro, api_key, gateway),
        },
    ]
}
