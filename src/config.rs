//! Startup configuration from the environment

use crate::llm::LlmConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub port: u16,
    pub max_output_tokens: u32,
    pub exchange_timeout: Duration,
    /// Replaces the built-in tutor instruction when set
    pub system_prompt_file: Option<PathBuf>,
    /// TrueType font for exported message text; Latin-1 only without it
    pub pdf_font_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse(&lookup, "DSA_DOST_PORT", "a port number", DEFAULT_PORT)?;
        let max_output_tokens = parse(
            &lookup,
            "DSA_DOST_MAX_OUTPUT_TOKENS",
            "a positive integer",
            DEFAULT_MAX_OUTPUT_TOKENS,
        )?;
        let timeout_secs = parse(
            &lookup,
            "DSA_DOST_EXCHANGE_TIMEOUT_SECS",
            "a positive number of seconds",
            DEFAULT_EXCHANGE_TIMEOUT_SECS,
        )?;

        if max_output_tokens == 0 {
            return Err(invalid("DSA_DOST_MAX_OUTPUT_TOKENS", "a positive integer", "0"));
        }
        if timeout_secs == 0 {
            return Err(invalid(
                "DSA_DOST_EXCHANGE_TIMEOUT_SECS",
                "a positive number of seconds",
                "0",
            ));
        }

        Ok(Self {
            llm: LlmConfig::from_lookup(&lookup),
            port,
            max_output_tokens,
            exchange_timeout: Duration::from_secs(timeout_secs),
            system_prompt_file: path(&lookup, "DSA_DOST_SYSTEM_PROMPT_FILE"),
            pdf_font_file: path(&lookup, "DSA_DOST_PDF_FONT_FILE"),
        })
    }
}

fn path(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<PathBuf> {
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn invalid(var: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(var, expected, &raw)),
    }
}
