//! OpenAI-compatible HTTP gateway.
//!
//! Talks to `/chat/completions`, `/images/generations`,
//! `/audio/transcriptions`, and (when a video model is configured) an
//! images-shaped `/videos/generations` endpoint. The request timeout set on
//! the HTTP client is the only timeout layer; an expired request surfaces as
//! a transient failure.

use crate::error::GatewayError;
use crate::gateway::{ChatMessage, GenerationGateway, GenerationRequest, MediaReference};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Connection settings for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Chat completion model.
    pub chat_model: String,
    /// Image generation model.
    pub image_model: String,
    /// Video generation model; video is unavailable when unset.
    pub video_model: Option<String>,
    /// Speech-to-text model.
    pub transcription_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration with the stock OpenAI endpoint and models.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            video_model: None,
            transcription_model: "whisper-1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MediaBody<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    data: Vec<MediaDatum>,
}

#[derive(Debug, Deserialize)]
struct MediaDatum {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Gateway backed by an OpenAI-compatible REST API.
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGateway {
    /// Creates a gateway with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unknown {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, retry_after, &body);
            warn!(status = status.as_u16(), category = %err.category(), "provider returned an error");
            return Err(err);
        }

        response.json::<T>().await.map_err(|e| GatewayError::Unknown {
            reason: format!("failed to decode provider response: {e}"),
        })
    }

    async fn generate_media(
        &self,
        path: &str,
        model: &str,
        prompt: &str,
        image: bool,
    ) -> Result<String, GatewayError> {
        let body = MediaBody {
            model,
            prompt,
            n: 1,
            size: image.then_some("1024x1024"),
            quality: image.then_some("standard"),
        };
        let response: MediaResponse = self.send(self.client.post(self.url(path)).json(&body)).await?;
        response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| GatewayError::Unknown {
                reason: "provider returned no media URL".to_string(),
            })
    }
}

#[async_trait]
impl GenerationGateway for OpenAiGateway {
    #[instrument(skip(self, request), fields(model = %self.config.chat_model, history = request.history.len()))]
    async fn complete_chat(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let body = ChatCompletionBody {
            model: &self.config.chat_model,
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let response: ChatCompletionResponse = self
            .send(self.client.post(self.url("chat/completions")).json(&body))
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::Unknown {
                reason: "provider returned no completion".to_string(),
            })?;
        debug!(chars = content.chars().count(), "chat completion received");
        Ok(content.trim().to_string())
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.image_model))]
    async fn generate_image(&self, prompt: &str) -> Result<MediaReference, GatewayError> {
        let location = self
            .generate_media("images/generations", &self.config.image_model, prompt, true)
            .await?;
        Ok(MediaReference::image(location))
    }

    #[instrument(skip(self, prompt))]
    async fn generate_video(&self, prompt: &str) -> Result<MediaReference, GatewayError> {
        let Some(model) = self.config.video_model.as_deref() else {
            return Err(GatewayError::Unknown {
                reason: "no video model configured".to_string(),
            });
        };
        let location = self
            .generate_media("videos/generations", model, prompt, false)
            .await?;
        Ok(MediaReference::video(location))
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    async fn transcribe_audio(&self, audio: &[u8]) -> Result<String, GatewayError> {
        let form = Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", Part::bytes(audio.to_vec()).file_name("voice.ogg"));
        let response: TranscriptionResponse = self
            .send(self.client.post(self.url("audio/transcriptions")).multipart(form))
            .await?;
        Ok(response.text.trim().to_string())
    }
}

/// Maps a non-success HTTP status and body onto a failure category.
fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);
    let reason = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if status == StatusCode::TOO_MANY_REQUESTS {
        return GatewayError::RateLimited { retry_after_secs };
    }

    if status == StatusCode::BAD_REQUEST && detail.as_ref().is_some_and(is_policy_violation) {
        return GatewayError::ContentRejected { reason };
    }

    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return GatewayError::Transient { reason };
    }

    GatewayError::Unknown { reason }
}

fn is_policy_violation(detail: &ApiErrorDetail) -> bool {
    if detail.code.as_deref() == Some("content_policy_violation") {
        return true;
    }
    let message = detail.message.to_lowercase();
    message.contains("safety system") || message.contains("content policy")
}

fn classify_transport(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        GatewayError::Transient {
            reason: err.to_string(),
        }
    } else {
        GatewayError::Unknown {
            reason: err.to_string(),
        }
    }
}
