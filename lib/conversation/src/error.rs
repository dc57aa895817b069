//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ValidationError`: Rejected navigation input
//! - `HistoryError`: History store backend failures
//! - `DeliveryError`: Failures reported by the delivery channel
//! - `ConfigError`: Invalid conversation configuration values
//! - `TurnError`: Failures that end a turn without a reply

use std::fmt;

/// Errors from validating user navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Navigation target is not a registered mode.
    UnknownMode { mode: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMode { mode } => write!(f, "unknown mode: {mode}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from history store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => write!(f, "history storage failed: {reason}"),
        }
    }
}

impl std::error::Error for HistoryError {}

/// Errors reported by a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel refused the rich markup.
    MarkupRejected { reason: String },
    /// The message could not be sent at all.
    Transport { reason: String },
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkupRejected { reason } => write!(f, "markup rejected: {reason}"),
            Self::Transport { reason } => write!(f, "delivery failed: {reason}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Errors from conversation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of range.
    InvalidValue { key: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, reason } => {
                write!(f, "invalid configuration value for '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that end a turn without a reply.
///
/// Gateway failures are not here: they become user-visible replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The navigation target was rejected.
    InvalidNavigation { details: String },
    /// The history store failed.
    HistoryUnavailable { details: String },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNavigation { details } => write!(f, "invalid navigation: {details}"),
            Self::HistoryUnavailable { details } => write!(f, "history unavailable: {details}"),
        }
    }
}

impl std::error::Error for TurnError {}
