//! Generation gateway for persona-desk.
//!
//! This crate provides:
//!
//! - **Gateway contract**: [`GenerationGateway`] with chat completion, image
//!   and video generation, and speech transcription entry points
//! - **Failure taxonomy**: [`GatewayError`] folded into [`FailureCategory`]
//! - **OpenAI adapter**: [`OpenAiGateway`] for OpenAI-compatible providers

pub mod error;
pub mod gateway;
pub mod openai;

pub use error::{FailureCategory, GatewayError};
pub use gateway::{
    ChatMessage, ChatRole, GenerationGateway, GenerationRequest, MediaKind, MediaReference,
};
pub use openai::{OpenAiConfig, OpenAiGateway};
