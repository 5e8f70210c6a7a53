//! cfgdrift Annotation Ledger and Status Aggregator
//!
//! Operator review state for drift scans.
//!
//! # Core Operations
//!
//! - **Identify**: [`MatchIdentity`] names a match by volatile and stable id
//! - **Annotate**: [`AnnotationLedger`] stores review flags and comments,
//!   carrying them across value changes
//! - **Roll up**: [`summarize`] derives instance and namespace statuses
//! - **Persist**: [`AnnotationStore`] saves ledger snapshots per [`ScanSignature`]
//! - **Export**: [`ReportRow`] / [`ReportSnapshot`] round-trip scan results
//!
//! # Architecture
//!
//! ```text
//! NamespaceResult[] ──┬─→ summarize ──→ NamespaceSummary[]
//!                     │        ↑
//! AnnotationLedger ───┴────────┘
//!        │
//!        └─ snapshot / restore ──→ AnnotationStore (memory, JSON files)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod export;
pub mod identity;
pub mod ledger;
pub mod status;
pub mod store;

pub use error::{ExportError, MatchIdError, StoreError};
pub use export::{ledger_from_rows, results_from_rows, rows_from_results, ReportRow, ReportSnapshot};
pub use identity::{MatchId, MatchIdentity};
pub use ledger::{
    AnnotationField, AnnotationLedger, AnnotationRecord, AnnotationUpdate, IdKind, SharedLedger,
    StoredAnnotation,
};
pub use status::{
    failed_status, instance_status, namespace_status, rollup, summarize, InstanceSummary,
    NamespaceSummary, ReviewStatus, StatusCounts,
};
pub use store::{
    load_into, save_ledger, AnnotationStore, InMemoryAnnotationStore, JsonFileStore, ScanSignature,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
