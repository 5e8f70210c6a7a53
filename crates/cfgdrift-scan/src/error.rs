//! Error types for the scan orchestrator
//!
//! Only [`ScanError`] ever reaches the caller of a scan. Fetch and
//! enumeration failures are contained into error entries of the result.

use crate::config::ScanConfig;
use cfgdrift_resolve::InvalidPatternError;
use cfgdrift_source::ParseError;

/// Errors that abort a scan before any work starts
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Pattern does not compile
    #[error(transparent)]
    InvalidPattern(#[from] InvalidPatternError),
}

/// Failure fetching one instance's payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Backend answered with a failure status
    #[error(
        "HTTP {status}{}: {message}",
        .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
    )]
    Status {
        /// HTTP status
        status: u16,
        /// Backend error code (`no_running_pods`, `actuator_unreachable`, ...)
        code: Option<String>,
        /// Backend message
        message: String,
    },

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload arrived but cannot be decoded
    #[error("undecodable payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Status failure without a backend code
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Status failure carrying a backend code
    pub fn coded(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Whether attempt number `attempt` (1-based) should be followed by another
    #[must_use]
    pub fn is_retryable(&self, config: &ScanConfig, attempt: u32) -> bool {
        if attempt >= config.max_attempts {
            return false;
        }
        match self {
            Self::Status { status, .. } => config.is_retryable_status(*status),
            Self::Transport(_) => true,
            Self::Decode(_) => false,
        }
    }
}

impl From<ParseError> for FetchError {
    fn from(err: ParseError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Failure enumerating a namespace
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot list instances in {namespace}: {message}")]
pub struct InventoryError {
    /// Namespace being enumerated
    pub namespace: String,
    /// Cause
    pub message: String,
}

impl InventoryError {
    /// Create an enumeration failure
    pub fn new(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            message: message.into(),
        }
    }
}

/// Invalid scan configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_code() {
        let err = FetchError::coded(503, "no_running_pods", "no running pods for billing");
        assert_eq!(err.to_string(), "HTTP 503 (no_running_pods): no running pods for billing");
        assert_eq!(FetchError::status(404, "not found").to_string(), "HTTP 404: not found");
    }

    #[test]
    fn retry_classification() {
        let config = ScanConfig::default();
        assert!(FetchError::status(503, "").is_retryable(&config, 1));
        assert!(FetchError::status(429, "").is_retryable(&config, 2));
        assert!(!FetchError::status(503, "").is_retryable(&config, 3));
        assert!(!FetchError::status(404, "").is_retryable(&config, 1));
        assert!(FetchError::Transport("reset".into()).is_retryable(&config, 2));
        assert!(!FetchError::Transport("reset".into()).is_retryable(&config, 3));
        assert!(!FetchError::Decode("bad".into()).is_retryable(&config, 1));
    }

    #[test]
    fn parse_errors_become_decode_failures() {
        let parse = ParseError::UnrecognizedShape("object with keys [a]".into());
        assert!(matches!(
            FetchError::from(parse),
            FetchError::Decode(m) if m.contains("object with keys")
        ));
    }
}
