//! Fatal errors for the console front-end.

use std::fmt;

/// Errors that stop the application.
#[derive(Debug)]
pub enum AppError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The generation gateway could not be constructed.
    Gateway { details: String },
    /// Console input or output failed.
    Io { details: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Gateway { details } => write!(f, "gateway setup failed: {details}"),
            Self::Io { details } => write!(f, "console i/o failed: {details}"),
        }
    }
}

impl std::error::Error for AppError {}
