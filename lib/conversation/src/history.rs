//! Bounded per-(session, mode) message history.
//!
//! Each (session, mode) pair owns its own sequence of entries. Appending
//! trims the oldest entries once the sequence exceeds `2 × max_pairs`, so
//! the newest exchanges are always the ones kept. The store does not
//! enforce user/assistant alternation; callers append in that order.

use crate::error::HistoryError;
use crate::persona::ModeId;
use async_trait::async_trait;
use persona_desk_ai::ChatMessage;
use persona_desk_core::{Result, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Pairs retained per (session, mode) unless configured otherwise.
pub const DEFAULT_MAX_HISTORY_PAIRS: usize = 10;

/// The author of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// One message in a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who wrote it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl HistoryEntry {
    /// Creates a user entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&HistoryEntry> for ChatMessage {
    fn from(entry: &HistoryEntry) -> Self {
        match entry.role {
            Role::User => ChatMessage::user(entry.content.clone()),
            Role::Assistant => ChatMessage::assistant(entry.content.clone()),
        }
    }
}

/// Snapshot of one (session, mode) history, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Creates a snapshot from entries.
    #[must_use]
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the newest entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Converts the entries to gateway messages.
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.entries.iter().map(ChatMessage::from).collect()
    }
}

/// Trait for history storage.
///
/// Implementations must isolate (session, mode) keys from each other so
/// that concurrent turns on different sessions never contend on one lock.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Gets the history for a (session, mode) pair, creating it if absent.
    async fn get(&self, session: &SessionId, mode: &ModeId) -> Result<History, HistoryError>;

    /// Appends an entry, then trims to the bound.
    async fn append(
        &self,
        session: &SessionId,
        mode: &ModeId,
        entry: HistoryEntry,
    ) -> Result<(), HistoryError>;

    /// Clears the history for a (session, mode) pair.
    async fn reset(&self, session: &SessionId, mode: &ModeId) -> Result<(), HistoryError>;
}

type Slot = Arc<Mutex<VecDeque<HistoryEntry>>>;

/// In-process history store.
///
/// The outer map is locked only to find or create a slot; each slot has its
/// own lock, so appends on different keys do not serialize on each other.
/// Nothing survives a restart.
#[derive(Debug)]
pub struct InMemoryHistoryStore {
    max_pairs: usize,
    slots: RwLock<HashMap<(SessionId, ModeId), Slot>>,
}

impl InMemoryHistoryStore {
    /// Creates a store retaining `max_pairs` pairs per key (at least one).
    #[must_use]
    pub fn new(max_pairs: usize) -> Self {
        Self {
            max_pairs: max_pairs.max(1),
            slots: RwLock::new(HashMap::new()),
        }
    }

    fn max_entries(&self) -> usize {
        self.max_pairs * 2
    }

    fn slot(&self, session: &SessionId, mode: &ModeId) -> Slot {
        let key = (session.clone(), mode.clone());
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_PAIRS)
    }
}

/// Drops the oldest entries until at most `max_entries` remain.
fn trim_oldest(entries: &mut VecDeque<HistoryEntry>, max_entries: usize) {
    while entries.len() > max_entries {
        entries.pop_front();
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get(&self, session: &SessionId, mode: &ModeId) -> Result<History, HistoryError> {
        let slot = self.slot(session, mode);
        let entries = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(History::new(entries.iter().cloned().collect()))
    }

    async fn append(
        &self,
        session: &SessionId,
        mode: &ModeId,
        entry: HistoryEntry,
    ) -> Result<(), HistoryError> {
        let slot = self.slot(session, mode);
        let mut entries = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        trim_oldest(&mut entries, self.max_entries());
        Ok(())
    }

    async fn reset(&self, session: &SessionId, mode: &ModeId) -> Result<(), HistoryError> {
        let slot = self.slot(session, mode);
        slot.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }
}
