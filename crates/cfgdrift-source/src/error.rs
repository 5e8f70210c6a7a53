//! Error types for the Source Normalizer
//!
//! Two tiers:
//! - [`ParseError`] rejects a payload outright (it cannot be classified at all)
//! - [`ParsePayloadWarning`] is attached to a normalized result and never
//!   prevents the remaining sources from being used

use serde::{Deserialize, Serialize};

/// Errors while decoding a raw payload document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Payload body is not valid JSON
    #[error("invalid json payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON is valid but matches none of the known payload shapes
    #[error("unrecognized payload shape: {0}")]
    UnrecognizedShape(String),
}

/// Non-fatal problems found while normalizing a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParsePayloadWarning {
    /// An embedded JSON document could not be decoded
    #[error("malformed json in {origin}: {message}")]
    MalformedJson {
        /// Where the embedded document came from
        origin: String,
        /// Decoder message
        message: String,
    },

    /// A text blob was cut short by the collector
    #[error("content of {origin} was truncated; trailing keys may be missing")]
    Truncated {
        /// Blob location
        origin: String,
    },

    /// The config server answered with an error or was unreachable
    #[error("config server {} unavailable: {detail}", .url.as_deref().unwrap_or("<unknown>"))]
    ConfigServerUnavailable {
        /// Request URL, when known
        url: Option<String>,
        /// Status line or transport error
        detail: String,
    },
}

impl ParsePayloadWarning {
    /// Create a malformed JSON warning
    pub fn malformed_json(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedJson {
            origin: origin.into(),
            message: message.into(),
        }
    }
}
