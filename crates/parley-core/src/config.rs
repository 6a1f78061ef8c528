//! Runtime configuration.
//!
//! `AssistantConfig` is read from an optional `config.toml` and then
//! overridden by `PARLEY_*` environment variables. Credentials are kept
//! apart in [`SecretConfig`] (`secret.json`).

use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Tunables for the conversation core. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Turns kept per user (user and assistant turns both count).
    pub max_context_turns: usize,
    /// Attempts per completion call, including the first.
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    /// Length of one backoff time unit; the wait before retry `n` is `2^n` units.
    pub backoff_unit_ms: u64,
    /// Maximum characters per outbound chunk.
    pub reply_chunk_size: usize,
    pub chunk_pause_ms: u64,
    /// Replies at or below this many characters are not cached.
    pub min_cached_reply_chars: usize,
    /// Location of the Q&A store. `None` selects the platform data directory.
    pub data_file: Option<PathBuf>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_context_turns: 30,
            max_retries: 3,
            request_timeout_secs: 30,
            backoff_unit_ms: 1000,
            reply_chunk_size: 4000,
            chunk_pause_ms: 1000,
            min_cached_reply_chars: 20,
            data_file: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1500,
            temperature: 0.8,
        }
    }
}

impl AssistantConfig {
    /// Parses a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PARLEY_MAX_CONTEXT_TURNS") {
            self.max_context_turns = parse_var("PARLEY_MAX_CONTEXT_TURNS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_MAX_RETRIES") {
            self.max_retries = parse_var("PARLEY_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("PARLEY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("PARLEY_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_BACKOFF_UNIT_MS") {
            self.backoff_unit_ms = parse_var("PARLEY_BACKOFF_UNIT_MS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_REPLY_CHUNK_SIZE") {
            self.reply_chunk_size = parse_var("PARLEY_REPLY_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("PARLEY_CHUNK_PAUSE_MS") {
            self.chunk_pause_ms = parse_var("PARLEY_CHUNK_PAUSE_MS", &v)?;
        }
        if let Some(v) = lookup("PARLEY_DATA_DIR") {
            self.data_file = Some(PathBuf::from(v).join("data.json"));
        }
        if let Some(v) = lookup("OPENAI_MODEL_NAME") {
            self.model = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_context_turns == 0 {
            return Err(ParleyError::config("max_context_turns must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(ParleyError::config("max_retries must be at least 1"));
        }
        if self.reply_chunk_size == 0 {
            return Err(ParleyError::config("reply_chunk_size must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ParleyError::config("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ParleyError::config(format!("{key} has an invalid value: '{value}'")))
}

/// Root structure of `secret.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<OpenAiSecret>,
}

/// OpenAI API credentials.
#[derive(Clone, Deserialize)]
pub struct OpenAiSecret {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
    /// Alternative Chat Completions endpoint (OpenAI-compatible servers).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl OpenAiSecret {
    /// The key with everything but the last four characters masked.
    pub fn masked_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

impl std::fmt::Debug for OpenAiSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSecret")
            .field("api_key", &self.masked_key())
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Masks a secret for logging, keeping its last four characters.
///
/// Secrets of four characters or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    const VISIBLE_TAIL: usize = 4;
    let chars: Vec<char> = secret.chars().collect();
    let visible = if chars.len() > VISIBLE_TAIL { VISIBLE_TAIL } else { 0 };
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{}", "*".repeat(hidden), tail)
}
