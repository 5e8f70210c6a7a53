//! Error types for the annotation ledger, stores and export

/// Errors parsing a match identifier
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchIdError {
    /// Not hexadecimal
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Wrong digest length
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },
}

/// Errors from an annotation store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors exporting or importing reports
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Snapshot document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row carries neither a match nor an error
    #[error("row for {namespace}/{instance} has neither a match nor an error")]
    IncompleteRow {
        /// Namespace of the row
        namespace: String,
        /// Instance of the row
        instance: String,
    },
}
