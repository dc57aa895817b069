//! Per-session mode state machine.
//!
//! Every session starts in the default mode. Explicit navigation moves it
//! anywhere registered; a completed exchange in a non-sticky mode moves it
//! back to default. Sessions in the default mode are not stored.

use crate::error::ValidationError;
use crate::persona::{ModeId, PersonaRegistry};
use persona_desk_core::{Result, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Result of a mode transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    /// Mode before the transition.
    pub previous: ModeId,
    /// Mode after the transition.
    pub current: ModeId,
    /// Entry prompt of the new mode, for the caller to display.
    pub entry_prompt: String,
}

/// Holds the current mode of every session.
#[derive(Debug)]
pub struct ModeController {
    registry: Arc<PersonaRegistry>,
    modes: RwLock<HashMap<SessionId, ModeId>>,
}

impl ModeController {
    /// Creates a controller over a persona registry.
    #[must_use]
    pub fn new(registry: Arc<PersonaRegistry>) -> Self {
        Self {
            registry,
            modes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session's current mode.
    #[must_use]
    pub fn current(&self, session: &SessionId) -> ModeId {
        self.modes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    /// Moves the session to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownMode`] if the mode is not
    /// registered; the session's mode is left unchanged.
    pub fn navigate(
        &self,
        session: &SessionId,
        mode: &ModeId,
    ) -> Result<ModeChange, ValidationError> {
        let Some(persona) = self.registry.get(mode) else {
            return Err(ValidationError::UnknownMode {
                mode: mode.to_string(),
            }
            .into());
        };

        let previous = self.set(session, mode.clone());
        debug!(%session, from = %previous, to = %mode, "mode changed");
        Ok(ModeChange {
            previous,
            current: mode.clone(),
            entry_prompt: persona.entry_prompt.clone(),
        })
    }

    /// Moves the session back to the default mode.
    pub fn return_to_default(&self, session: &SessionId) -> ModeChange {
        let current = ModeId::default_mode();
        let previous = self.set(session, current.clone());
        debug!(%session, from = %previous, "returned to default mode");
        ModeChange {
            previous,
            current,
            entry_prompt: self.registry.default_persona().entry_prompt.clone(),
        }
    }

    /// Ends a one-shot exchange.
    ///
    /// Reverts to default if the current mode is not sticky and returns the
    /// change; returns `None` for sticky modes.
    pub fn consume_one_shot(&self, session: &SessionId) -> Option<ModeChange> {
        let mode = self.current(session);
        if self.registry.lookup(&mode).sticky {
            return None;
        }
        Some(self.return_to_default(session))
    }

    fn set(&self, session: &SessionId, mode: ModeId) -> ModeId {
        let mut modes = self.modes.write().unwrap_or_else(PoisonError::into_inner);
        let previous = if mode.is_default() {
            modes.remove(session)
        } else {
            modes.insert(session.clone(), mode)
        };
        previous.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaConfig;

    fn controller() -> ModeController {
        let registry = PersonaRegistry::new(PersonaConfig::chat("default", "Main menu", "sys"))
            .with(PersonaConfig::chat("psychologist", "I'm listening", "sys"))
            .with(PersonaConfig::single_shot("seo", "Send keywords", "sys"));
        ModeController::new(Arc::new(registry))
    }

    fn session() -> SessionId {
        SessionId::new("chat-1")
    }

    #[test]
    fn sessions_start_in_default() {
        assert!(controller().current(&session()).is_default());
    }

    #[test]
    fn navigate_emits_entry_prompt() {
        let controller = controller();
        let change = controller
            .navigate(&session(), &ModeId::new("seo"))
            .unwrap();

        assert_eq!(change.previous, ModeId::default_mode());
        assert_eq!(change.current, ModeId::new("seo"));
        assert_eq!(change.entry_prompt, "Send keywords");
        assert_eq!(controller.current(&session()), ModeId::new("seo"));
    }

    #[test]
    fn unknown_mode_is_rejected_without_state_change() {
        let controller = controller();
        controller
            .navigate(&session(), &ModeId::new("psychologist"))
            .unwrap();

        let err = controller
            .navigate(&session(), &ModeId::new("tarot"))
            .unwrap_err();

        assert!(err.to_string().contains("tarot"));
        assert_eq!(controller.current(&session()), ModeId::new("psychologist"));
    }

    #[test]
    fn back_returns_to_default() {
        let controller = controller();
        controller
            .navigate(&session(), &ModeId::new("psychologist"))
            .unwrap();

        let change = controller.return_to_default(&session());

        assert_eq!(change.previous, ModeId::new("psychologist"));
        assert_eq!(change.entry_prompt, "Main menu");
        assert!(controller.current(&session()).is_default());
    }

    #[test]
    fn one_shot_modes_revert() {
        let controller = controller();
        controller.navigate(&session(), &ModeId::new("seo")).unwrap();

        let change = controller.consume_one_shot(&session());

        assert_eq!(change.map(|c| c.previous), Some(ModeId::new("seo")));
        assert!(controller.current(&session()).is_default());
    }

    #[test]
    fn sticky_modes_do_not_revert() {
        let controller = controller();
        controller
            .navigate(&session(), &ModeId::new("psychologist"))
            .unwrap();

        assert_eq!(controller.consume_one_shot(&session()), None);
        assert_eq!(controller.current(&session()), ModeId::new("psychologist"));
    }

    #[test]
    fn sessions_are_independent() {
        let controller = controller();
        let other = SessionId::new("chat-2");
        controller.navigate(&session(), &ModeId::new("seo")).unwrap();

        assert!(controller.current(&other).is_default());
    }
}
