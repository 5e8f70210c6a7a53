//! Payload normalization
//!
//! One normalizer per [`RawPayload`] variant, all producing
//! [`NormalizedSources`] in precedence order.

use crate::payload::RawPayload;
use crate::source::{NormalizedSources, PropertySource};

mod actuator;
mod bundle;
mod config_server;

pub use actuator::normalize_actuator;
pub use bundle::normalize_bundle;
pub use config_server::{classify_config_source, normalize_config_server};

/// Per-instance inputs to normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Instance (workload) name used to classify config server documents
    pub workload_name: String,
    /// Explicit active profiles; overrides whatever the payload reports
    pub active_profiles: Option<Vec<String>>,
}

impl NormalizeOptions {
    /// Options for a named workload
    #[inline]
    #[must_use]
    pub fn new(workload_name: impl Into<String>) -> Self {
        Self {
            workload_name: workload_name.into(),
            active_profiles: None,
        }
    }

    /// Force a set of active profiles
    #[inline]
    #[must_use]
    pub fn with_active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = Some(profiles.into_iter().map(Into::into).collect());
        self
    }
}

/// Normalize any payload shape into ranked property sources
#[must_use]
pub fn normalize(payload: &RawPayload, options: &NormalizeOptions) -> NormalizedSources {
    let normalized = match payload {
        RawPayload::Actuator(actuator) => normalize_actuator(actuator, options),
        RawPayload::ConfigServer(config) => NormalizedSources {
            sources: normalize_config_server(config, &options.workload_name),
            warnings: Vec::new(),
            active_profiles: options
                .active_profiles
                .clone()
                .unwrap_or_else(|| config.profiles.clone()),
        },
        RawPayload::TextBundle(bundle) => normalize_bundle(bundle, options),
    };

    for warning in &normalized.warnings {
        tracing::warn!(workload = %options.workload_name, "payload warning: {}", warning);
    }
    tracing::debug!(
        workload = %options.workload_name,
        kind = payload.kind(),
        sources = normalized.sources.len(),
        properties = normalized.property_count(),
        "normalized payload"
    );

    normalized
}

/// Combine sources from several extraction channels into precedence order
///
/// Stable by category rank, so each category keeps discovery order.
/// Unclassified sources and empty sources are dropped.
#[must_use]
pub fn order_combined(mut sources: Vec<PropertySource>) -> Vec<PropertySource> {
    sources.retain(|s| s.category().is_classified() && !s.is_empty());
    sources.sort_by_key(|s| s.category().rank());
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ActuatorPayload, ActuatorSource, ConfigServerPayload, ConfigServerSource};
    use crate::source::Category;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn order_combined_ranks_and_drops() {
        let sources = vec![
            PropertySource::new("boot", Category::Bootstrap, [("a", json!(1))]),
            PropertySource::new("other", Category::Other, [("a", json!(2))]),
            PropertySource::new("app", Category::Application, [("a", json!(3))]),
            PropertySource::new("empty", Category::ConfigApp, Vec::<(String, _)>::new()),
            PropertySource::new("wl", Category::ConfigWorkload, [("a", json!(4))]),
            PropertySource::new("app2", Category::Application, [("b", json!(5))]),
        ];
        let names: Vec<String> = order_combined(sources)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["wl", "app", "app2", "boot"]);
    }

    #[test]
    fn dispatches_on_variant() {
        let actuator = RawPayload::Actuator(ActuatorPayload {
            active_profiles: vec!["prod".into()],
            property_sources: vec![ActuatorSource {
                name: "env".into(),
                properties: IndexMap::from([("a".to_string(), json!({"value": "1"}))]),
            }],
        });
        let normalized = normalize(&actuator, &NormalizeOptions::new("billing"));
        assert_eq!(normalized.sources.len(), 1);
        assert_eq!(normalized.active_profiles, vec!["prod"]);

        let config = RawPayload::ConfigServer(ConfigServerPayload {
            name: Some("billing".into()),
            profiles: vec!["default".into()],
            label: None,
            property_sources: vec![ConfigServerSource {
                name: "repo/billing.yml".into(),
                source: IndexMap::from([("a".to_string(), json!("1"))]),
            }],
        });
        let normalized = normalize(&config, &NormalizeOptions::new("billing"));
        assert_eq!(normalized.sources[0].category(), Category::ConfigWorkload);
        assert_eq!(normalized.active_profiles, vec!["default"]);
    }

    #[test]
    fn explicit_profiles_override_payload() {
        let options = NormalizeOptions::new("billing").with_active_profiles(["qa"]);
        assert_eq!(options.active_profiles, Some(vec!["qa".to_string()]));
    }
}
