//! cfgdrift Precedence Resolver and Pattern Matcher
//!
//! Computes which source wins for every key of an instance and finds the
//! keys or values matching an operator pattern.
//!
//! # Core Operations
//!
//! - **Resolve**: [`EffectiveIndex::resolve`] picks one winner per key
//! - **Explain**: list every definition of a key, winner first
//! - **Match**: [`Matcher`] tests keys and values, exposes highlight spans
//! - **Extract**: [`find_matches`] turns sources into sorted [`MatchEntry`] lists
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgdrift_resolve::{find_matches, Matcher, SearchMode};
//!
//! let matcher = Matcher::compile(r"db\.url", false)?;
//! let matches = find_matches(&normalized.sources, &matcher, SearchMode::Effective);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod effective;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod query;
pub mod report;

pub use effective::{
    display_value, order_sources, unwrap_value, Definition, EffectiveEntry, EffectiveIndex,
    SourceEntry,
};
pub use error::InvalidPatternError;
pub use extract::{find_matches, SearchMode};
pub use matcher::{MatchOn, MatchScope, Matcher};
pub use query::ScanQuery;
pub use report::{
    CleanInstance, ErrorEntry, InstanceOutcome, InstanceResult, MatchEntry, NamespaceResult,
    WorkloadKind, WorkloadRef,
};

pub use cfgdrift_source::ParsePayloadWarning;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
