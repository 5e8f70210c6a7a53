//! Error types for resolution and matching

/// A user-supplied pattern failed to compile
///
/// Raised before any scanning work starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {message}")]
pub struct InvalidPatternError {
    /// The pattern as supplied
    pub pattern: String,
    /// Syntax error reported by the regex engine
    pub message: String,
}

impl InvalidPatternError {
    pub(crate) fn from_regex(pattern: &str, err: &regex::Error) -> Self {
        Self {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}
