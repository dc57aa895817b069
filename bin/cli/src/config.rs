//! Centralized application configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! `__` as the separator, so `PERSONAS__SEO__TEMPERATURE=0.6` overrides the
//! temperature of the `seo` persona.

use persona_desk_ai::OpenAiConfig;
use persona_desk_conversation::{ConversationConfig, DEFAULT_MAX_HISTORY_PAIRS, PersonaOverride};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Provider API key. Required.
    pub openai_api_key: String,

    /// Provider base URL.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Chat completion model.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Image generation model.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Video generation model. Video mode fails when unset.
    #[serde(default)]
    pub video_model: Option<String>,

    /// Speech-to-text model.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Per-request timeout for provider calls, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// User/assistant pairs retained per (session, mode).
    #[serde(default = "default_max_history_pairs")]
    pub max_history_pairs: usize,

    /// Persona overrides keyed by mode id.
    #[serde(default)]
    pub personas: HashMap<String, PersonaOverride>,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_max_history_pairs() -> usize {
    DEFAULT_MAX_HISTORY_PAIRS
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the values consumed by the conversation core.
    #[must_use]
    pub fn conversation(&self) -> ConversationConfig {
        ConversationConfig {
            max_history_pairs: self.max_history_pairs,
            personas: self.personas.clone(),
        }
    }

    /// Returns the provider connection settings.
    #[must_use]
    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            chat_model: self.chat_model.clone(),
            image_model: self.image_model.clone(),
            video_model: self.video_model.clone(),
            transcription_model: self.transcription_model.clone(),
            ..OpenAiConfig::new(self.openai_api_key.clone())
                .with_base_url(self.openai_base_url.clone())
                .with_timeout(Duration::from_secs(self.request_timeout_seconds))
        }
    }
}
