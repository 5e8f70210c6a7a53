//! cfgdrift Scan Orchestrator
//!
//! Scans many namespaces of service instances for configuration keys or
//! values matching a pattern, tolerating partial failure.
//!
//! # Core Operations
//!
//! - **Scan**: [`Scanner::scan`] fans out over namespaces and instances with
//!   bounded concurrency, returning sorted [`NamespaceResult`]s
//! - **Retry**: [`fetch_with_retry`] retries transient fetch failures with
//!   linear backoff
//! - **Re-scan**: [`Scanner::rescan_instance`] refreshes one instance in place
//!
//! # Architecture
//!
//! ```text
//! ScanQuery ─→ Scanner ─┬─ WorkloadInventory::list_instances  (per namespace)
//!                       └─ PayloadFetcher::fetch (+ retry)     (per instance)
//!                              │
//!                              ↓
//!          RawPayload → normalize → find_matches → InstanceOutcome
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgdrift_scan::{ScanConfig, Scanner};
//! use cfgdrift_resolve::ScanQuery;
//!
//! let scanner = Scanner::new(inventory, fetcher).with_config(ScanConfig::default());
//! let report = scanner
//!     .scan(&ScanQuery::new(r"db\.url").with_namespaces(["team-a", "team-b"]))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod collab;
pub mod config;
pub mod error;
pub mod retry;
pub mod scanner;

pub use collab::{PayloadFetcher, WorkloadInventory};
pub use config::ScanConfig;
pub use error::{ConfigError, FetchError, InventoryError, ScanError};
pub use retry::fetch_with_retry;
pub use scanner::{ScanReport, Scanner};

pub use cfgdrift_resolve::NamespaceResult;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
