//! Declarative navigation tokens.
//!
//! Maps the text of a menu button (or any other distinguished token) to a
//! navigation target, keeping button labels out of the mode logic.

use crate::persona::ModeId;

/// Where a navigation token leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Enter a mode.
    Enter(ModeId),
    /// Return to the default mode.
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationEntry {
    label: String,
    target: NavigationTarget,
}

/// Ordered mapping from navigation token to target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationMap {
    entries: Vec<NavigationEntry>,
}

impl NavigationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token that enters a mode.
    #[must_use]
    pub fn with_mode(mut self, label: impl Into<String>, mode: impl Into<ModeId>) -> Self {
        self.entries.push(NavigationEntry {
            label: label.into(),
            target: NavigationTarget::Enter(mode.into()),
        });
        self
    }

    /// Adds a token that returns to the default mode.
    #[must_use]
    pub fn with_back(mut self, label: impl Into<String>) -> Self {
        self.entries.push(NavigationEntry {
            label: label.into(),
            target: NavigationTarget::Back,
        });
        self
    }

    /// Resolves input text to a navigation target.
    ///
    /// Matching is exact after trimming surrounding whitespace.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<&NavigationTarget> {
        let text = text.trim();
        self.entries
            .iter()
            .find(|entry| entry.label == text)
            .map(|entry| &entry.target)
    }

    /// Returns the labels in menu order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Returns the modes the map can enter.
    #[must_use]
    pub fn modes(&self) -> Vec<&ModeId> {
        self.entries
            .iter()
            .filter_map(|e| match &e.target {
                NavigationTarget::Enter(mode) => Some(mode),
                NavigationTarget::Back => None,
            })
            .collect()
    }
}
