//! Conversation configuration values.
//!
//! Loading is the front-end's job; this module only defines the values the
//! core consumes and their defaults.

use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_HISTORY_PAIRS;
use persona_desk_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-mode replacement values for the built-in persona catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaOverride {
    /// Replacement system instruction.
    #[serde(default)]
    pub system_instruction: Option<String>,
    /// Replacement entry prompt.
    #[serde(default)]
    pub entry_prompt: Option<String>,
    /// Replacement temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Replacement max output tokens.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// Values consumed by the conversation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// User/assistant pairs retained per (session, mode).
    #[serde(default = "default_max_history_pairs")]
    pub max_history_pairs: usize,

    /// Persona overrides keyed by mode id.
    #[serde(default)]
    pub personas: HashMap<String, PersonaOverride>,
}

fn default_max_history_pairs() -> usize {
    DEFAULT_MAX_HISTORY_PAIRS
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: default_max_history_pairs(),
            personas: HashMap::new(),
        }
    }
}

impl ConversationConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_pairs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_history_pairs".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        for (mode, over) in &self.personas {
            if let Some(temperature) = over.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("personas.{mode}.temperature"),
                        reason: format!("{temperature} is outside 0.0..=2.0"),
                    }
                    .into());
                }
            }
            if over.max_output_tokens == Some(0) {
                return Err(ConfigError::InvalidValue {
                    key: format!("personas.{mode}.max_output_tokens"),
                    reason: "must be at least 1".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
