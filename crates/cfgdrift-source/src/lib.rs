//! cfgdrift Source Normalizer
//!
//! The boundary between raw configuration payloads fetched from running
//! instances and the ranked property-source model used everywhere else.
//!
//! # Core Operations
//!
//! - **Detect**: find which payload shape a JSON document carries
//! - **Parse**: turn `.properties` and YAML-like text into flat key/value maps
//! - **Normalize**: produce an ordered `PropertySource` list per instance
//!
//! # Architecture
//!
//! ```text
//! JSON document → RawPayload::from_json ─┬─ Actuator     ─┐
//!                                         ├─ ConfigServer ─┼→ normalize → NormalizedSources
//!                                         └─ TextBundle   ─┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgdrift_source::{normalize, NormalizeOptions, RawPayload};
//!
//! let payload = RawPayload::from_str(body)?;
//! let normalized = normalize(&payload, &NormalizeOptions::new("billing"));
//! for source in &normalized.sources {
//!     println!("{} ({} keys)", source.name(), source.len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod error;
pub mod normalize;
pub mod parsers;
pub mod payload;
pub mod source;

// Re-exports for convenience
pub use error::{ParseError, ParsePayloadWarning};
pub use normalize::{normalize, NormalizeOptions};
pub use payload::{
    ActuatorPayload, ActuatorSource, BlobOrigin, ConfigServerPayload, ConfigServerResponse,
    ConfigServerSource, RawPayload, TextBlob, TextBundle,
};
pub use source::{Category, NormalizedSources, PropertySource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with property sources
    pub use crate::error::{ParseError, ParsePayloadWarning};
    pub use crate::normalize::{normalize, NormalizeOptions};
    pub use crate::payload::RawPayload;
    pub use crate::source::{Category, NormalizedSources, PropertySource};
}
