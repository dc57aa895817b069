//! Generation gateway abstraction.
//!
//! The conversation core talks to text, image, video, and speech providers
//! only through [`GenerationGateway`]. Implementations own their transport,
//! their timeouts, and the mapping of provider failures onto
//! [`GatewayError`] categories. The core never retries.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role of a message sent to a chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Persona system instruction.
    pub system_instruction: String,
    /// Prior exchanges, oldest first.
    pub history: Vec<ChatMessage>,
    /// The new user message.
    pub user_text: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Creates a request with no history.
    #[must_use]
    pub fn new(system_instruction: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history: Vec::new(),
            user_text: user_text.into(),
            temperature: 0.7,
            max_tokens: 1500,
        }
    }

    /// Adds prior exchanges.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Returns the full message list: system, history, then the new user turn.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_instruction.clone()));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.user_text.clone()));
        messages
    }
}

/// Kind of generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Short video clip.
    Video,
}

/// Opaque reference to generated media, usually a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// What the reference points at.
    pub kind: MediaKind,
    /// Where the delivery layer can fetch it.
    pub location: String,
}

impl MediaReference {
    /// Creates an image reference.
    #[must_use]
    pub fn image(location: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            location: location.into(),
        }
    }

    /// Creates a video reference.
    #[must_use]
    pub fn video(location: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            location: location.into(),
        }
    }
}

/// Trait for generation providers.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generates a chat reply.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`GatewayError`] if the provider call fails.
    async fn complete_chat(&self, request: &GenerationRequest) -> Result<String, GatewayError>;

    /// Generates an image from a prompt.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`GatewayError`] if the provider call fails.
    async fn generate_image(&self, prompt: &str) -> Result<MediaReference, GatewayError>;

    /// Generates a short video from a prompt.
    ///
    /// Providers without video support keep the default, which reports an
    /// unknown failure.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`GatewayError`] if the provider call fails.
    async fn generate_video(&self, prompt: &str) -> Result<MediaReference, GatewayError> {
        let _ = prompt;
        Err(GatewayError::Unknown {
            reason: "video generation is not supported by this gateway".to_string(),
        })
    }

    /// Transcribes speech to text.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`GatewayError`] if the provider call fails.
    async fn transcribe_audio(&self, audio: &[u8]) -> Result<String, GatewayError>;
}
