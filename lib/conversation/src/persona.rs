//! Persona registry.
//!
//! A persona is everything the core needs to know about one mode: the
//! instruction sent to the model, generation parameters, how the reply is
//! formatted, and whether the mode survives past a single exchange.

use crate::config::PersonaOverride;
use persona_desk_ai::MediaKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Identifier of the mode every session starts in.
pub const DEFAULT_MODE: &str = "default";

/// Placeholder replaced by the user's text in prompt templates.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Identifier of a mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(String);

impl ModeId {
    /// Creates a mode id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id of the default mode.
    #[must_use]
    pub fn default_mode() -> Self {
        Self(DEFAULT_MODE.to_string())
    }

    /// Returns true for the default mode.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_MODE
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModeId {
    fn default() -> Self {
        Self::default_mode()
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a persona does with the user's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Ongoing conversation backed by history.
    Chat,
    /// One request, one generated text.
    SingleShot,
    /// One prompt, one generated media reference.
    Media(MediaKind),
}

/// How generated text is rendered for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Sent as-is without markup.
    Plain,
    /// Bold/italic emphasis only; everything else is escaped.
    Emphasis,
    /// A bold title, an optional length line, then the text as a
    /// preformatted block.
    Preformatted {
        /// Title shown above the block.
        title: String,
        /// Line with a `{count}` placeholder for the character count.
        length_line: Option<String>,
    },
}

/// Configuration for one persona.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaConfig {
    /// Mode this persona serves.
    pub id: ModeId,
    /// Text shown when the user enters the mode.
    pub entry_prompt: String,
    /// Instruction sent as the system message.
    pub system_instruction: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
    /// Output rendering.
    pub format: FormatPolicy,
    /// What the persona does with input.
    pub capability: Capability,
    /// Whether the mode persists after an exchange.
    pub sticky: bool,
    /// Whether requests include the mode's history.
    pub carries_history: bool,
    /// Wrapper applied to the user's text, with an `{input}` placeholder.
    pub prompt_template: Option<String>,
    /// Shown while the single-shot request is running.
    pub acknowledgement: Option<String>,
    /// Shown instead of the generic message when generation fails.
    pub failure_message: Option<String>,
    /// Caption attached to generated media.
    pub media_caption: Option<String>,
}

impl PersonaConfig {
    /// Creates a sticky chat persona with history and emphasis markup.
    #[must_use]
    pub fn chat(
        id: impl Into<ModeId>,
        entry_prompt: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            entry_prompt: entry_prompt.into(),
            system_instruction: system_instruction.into(),
            temperature: 0.7,
            max_output_tokens: 1500,
            format: FormatPolicy::Emphasis,
            capability: Capability::Chat,
            sticky: true,
            carries_history: true,
            prompt_template: None,
            acknowledgement: None,
            failure_message: None,
            media_caption: None,
        }
    }

    /// Creates a one-shot text persona without history.
    #[must_use]
    pub fn single_shot(
        id: impl Into<ModeId>,
        entry_prompt: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            capability: Capability::SingleShot,
            sticky: false,
            carries_history: false,
            format: FormatPolicy::Plain,
            ..Self::chat(id, entry_prompt, system_instruction)
        }
    }

    /// Creates a one-shot media persona.
    #[must_use]
    pub fn media(id: impl Into<ModeId>, kind: MediaKind, entry_prompt: impl Into<String>) -> Self {
        Self {
            capability: Capability::Media(kind),
            sticky: false,
            carries_history: false,
            format: FormatPolicy::Plain,
            ..Self::chat(id, entry_prompt, String::new())
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the max output tokens.
    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Sets the format policy.
    #[must_use]
    pub fn with_format(mut self, format: FormatPolicy) -> Self {
        self.format = format;
        self
    }

    /// Sets the prompt template.
    #[must_use]
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Sets the acknowledgement.
    #[must_use]
    pub fn with_acknowledgement(mut self, acknowledgement: impl Into<String>) -> Self {
        self.acknowledgement = Some(acknowledgement.into());
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Sets the media caption.
    #[must_use]
    pub fn with_media_caption(mut self, caption: impl Into<String>) -> Self {
        self.media_caption = Some(caption.into());
        self
    }

    /// Sets whether requests include history.
    #[must_use]
    pub fn with_history(mut self, carries_history: bool) -> Self {
        self.carries_history = carries_history;
        self
    }

    /// Wraps user text in the prompt template.
    #[must_use]
    pub fn user_prompt(&self, input: &str) -> String {
        match &self.prompt_template {
            Some(template) => template.replace(INPUT_PLACEHOLDER, input),
            None => input.to_string(),
        }
    }

    fn apply_override(&mut self, over: &PersonaOverride) {
        if let Some(instruction) = &over.system_instruction {
            self.system_instruction.clone_from(instruction);
        }
        if let Some(entry_prompt) = &over.entry_prompt {
            self.entry_prompt.clone_from(entry_prompt);
        }
        if let Some(temperature) = over.temperature {
            self.temperature = temperature;
        }
        if let Some(max_output_tokens) = over.max_output_tokens {
            self.max_output_tokens = max_output_tokens;
        }
    }
}

/// Registry of personas keyed by mode.
///
/// Always contains the default persona, which is what [`lookup`] returns for
/// ids it does not know.
///
/// [`lookup`]: PersonaRegistry::lookup
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: HashMap<ModeId, PersonaConfig>,
}

impl PersonaRegistry {
    /// Creates a registry around the default persona.
    ///
    /// The persona's id is forced to the default mode.
    #[must_use]
    pub fn new(mut default: PersonaConfig) -> Self {
        default.id = ModeId::default_mode();
        let mut personas = HashMap::new();
        personas.insert(default.id.clone(), default);
        Self { personas }
    }

    /// Registers a persona, replacing any persona with the same id.
    pub fn register(&mut self, persona: PersonaConfig) {
        self.personas.insert(persona.id.clone(), persona);
    }

    /// Registers a persona (builder form).
    #[must_use]
    pub fn with(mut self, persona: PersonaConfig) -> Self {
        self.register(persona);
        self
    }

    /// Looks up a persona, falling back to the default persona.
    #[must_use]
    pub fn lookup(&self, mode: &ModeId) -> &PersonaConfig {
        if let Some(persona) = self.personas.get(mode) {
            return persona;
        }
        debug!(%mode, "unknown mode, using default persona");
        self.default_persona()
    }

    /// Gets a persona without falling back.
    #[must_use]
    pub fn get(&self, mode: &ModeId) -> Option<&PersonaConfig> {
        self.personas.get(mode)
    }

    /// Returns true if the mode is registered.
    #[must_use]
    pub fn contains(&self, mode: &ModeId) -> bool {
        self.personas.contains_key(mode)
    }

    /// Returns the default persona.
    #[must_use]
    pub fn default_persona(&self) -> &PersonaConfig {
        // `new` inserts the default persona and nothing removes it.
        &self.personas[&ModeId::default_mode()]
    }

    /// Applies configured overrides.
    ///
    /// Returns the override keys that matched no registered mode.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, PersonaOverride>) -> Vec<String> {
        let mut ignored = Vec::new();
        for (key, over) in overrides {
            match self.personas.get_mut(&ModeId::new(key.as_str())) {
                Some(persona) => persona.apply_override(over),
                None => {
                    warn!(mode = %key, "ignoring override for unknown mode");
                    ignored.push(key.clone());
                }
            }
        }
        ignored.sort();
        ignored
    }
}
