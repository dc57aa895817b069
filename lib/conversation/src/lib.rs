//! Mode-scoped conversation sessions for persona-desk.
//!
//! This crate provides:
//!
//! - **Persona Registry**: Instruction, parameters and output format per mode
//! - **Mode Controller**: Per-session mode state with one-shot reversion
//! - **History Store**: Bounded history keyed by (session, mode)
//! - **Response Formatter**: Safe markup rendering with plain-text fallback
//! - **Session Orchestrator**: The per-turn algorithm tying them together

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod mode;
pub mod navigation;
pub mod orchestrator;
pub mod persona;

pub use config::{ConversationConfig, PersonaOverride};
pub use error::{ConfigError, DeliveryError, HistoryError, TurnError, ValidationError};
pub use format::{Delivery, Markup, MessageSink, RenderedOutput, deliver, render};
pub use history::{
    DEFAULT_MAX_HISTORY_PAIRS, History, HistoryEntry, HistoryStore, InMemoryHistoryStore, Role,
};
pub use mode::{ModeChange, ModeController};
pub use navigation::{NavigationMap, NavigationTarget};
pub use orchestrator::{FailureMessages, Reply, SessionOrchestrator, TurnInput, TurnOutcome};
pub use persona::{Capability, FormatPolicy, ModeId, PersonaConfig, PersonaRegistry};
