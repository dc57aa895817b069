//! Error types for the generation gateway.
//!
//! Every provider failure is folded into one of four categories so callers
//! can pick a user-facing message without knowing which provider or
//! transport produced it.

use std::fmt;

/// Category of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// The provider throttled the request.
    RateLimited,
    /// The prompt or output violates provider policy.
    ContentRejected,
    /// Network trouble, timeouts, 5xx-equivalents.
    Transient,
    /// Anything that fits none of the above.
    Unknown,
}

impl FailureCategory {
    /// Returns the category as a static string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ContentRejected => "content_rejected",
            Self::Transient => "transient",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from generation gateway calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Provider refused the prompt or its output.
    ContentRejected { reason: String },
    /// Temporary failure, safe to retry later.
    Transient { reason: String },
    /// Unclassified failure.
    Unknown { reason: String },
}

impl GatewayError {
    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::RateLimited { .. } => FailureCategory::RateLimited,
            Self::ContentRejected { .. } => FailureCategory::ContentRejected,
            Self::Transient { .. } => FailureCategory::Transient,
            Self::Unknown { .. } => FailureCategory::Unknown,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ContentRejected { reason } => {
                write!(f, "content rejected by provider: {reason}")
            }
            Self::Transient { reason } => write!(f, "transient gateway failure: {reason}"),
            Self::Unknown { reason } => write!(f, "gateway failure: {reason}"),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let err = GatewayError::RateLimited {
            retry_after_secs: Some(20),
        };
        assert!(err.to_string().contains("20s"));
        assert_eq!(err.category(), FailureCategory::RateLimited);
    }

    #[test]
    fn content_rejected_keeps_reason() {
        let err = GatewayError::ContentRejected {
            reason: "safety system".to_string(),
        };
        assert!(err.to_string().contains("safety system"));
        assert_eq!(err.category(), FailureCategory::ContentRejected);
    }

    #[test]
    fn transient_category_name() {
        let err = GatewayError::Transient {
            reason: "timeout".to_string(),
        };
        assert_eq!(err.category().as_str(), "transient");
    }
}
