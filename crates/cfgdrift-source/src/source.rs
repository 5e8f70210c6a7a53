//! Property source model
//!
//! A [`PropertySource`] is one ranked origin of key/value pairs for a single
//! instance in a single scan. Sources are built once by the normalizer and
//! never mutated afterwards.

use crate::error::ParsePayloadWarning;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Precedence category of a property source
///
/// Declaration order is precedence order: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Config server document named after the workload
    ConfigWorkload,
    /// Config server document shared by every application
    ConfigApp,
    /// `application*` files packaged with the image
    Application,
    /// `bootstrap*` files packaged with the image
    Bootstrap,
    /// Anything else (actuator pass-through, unclassified)
    Other,
}

impl Category {
    /// Precedence rank (lower wins)
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::ConfigWorkload => 0,
            Self::ConfigApp => 1,
            Self::Application => 2,
            Self::Bootstrap => 3,
            Self::Other => 4,
        }
    }

    /// Wire key (`config-workload`, `application`, ...)
    #[inline]
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ConfigWorkload => "config-workload",
            Self::ConfigApp => "config-app",
            Self::Application => "application",
            Self::Bootstrap => "bootstrap",
            Self::Other => "other",
        }
    }

    /// Default display label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConfigWorkload => "Config server (workload)",
            Self::ConfigApp => "Config server (application)",
            Self::Application => "Application (image)",
            Self::Bootstrap => "Bootstrap (image)",
            Self::Other => "Other",
        }
    }

    /// Whether the category takes part in combined precedence output
    #[inline]
    #[must_use]
    pub const fn is_classified(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One named, categorized set of configuration properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySource {
    name: String,
    properties: IndexMap<String, Value>,
    category_key: Category,
    category_label: String,
}

impl PropertySource {
    /// Build a source with the category's default label
    pub fn new<K, I>(name: impl Into<String>, category: Category, properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            name: name.into(),
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            category_key: category,
            category_label: category.label().to_string(),
        }
    }

    /// Override the display label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.category_label = label.into();
        self
    }

    /// Source name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in discovery order
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// Look up a raw property value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Precedence category
    #[inline]
    #[must_use]
    pub fn category(&self) -> Category {
        self.category_key
    }

    /// Display label
    #[inline]
    #[must_use]
    pub fn category_label(&self) -> &str {
        &self.category_label
    }

    /// Number of properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the source defines no properties
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Output of the normalizer for one payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSources {
    /// Sources in precedence order
    pub sources: Vec<PropertySource>,
    /// Non-fatal problems met along the way
    #[serde(default)]
    pub warnings: Vec<ParsePayloadWarning>,
    /// Profiles that were considered active
    #[serde(default)]
    pub active_profiles: Vec<String>,
}

impl NormalizedSources {
    /// Total property count across sources
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.sources.iter().map(PropertySource::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_rank_follows_declaration_order() {
        let mut categories = vec![
            Category::Other,
            Category::Bootstrap,
            Category::ConfigApp,
            Category::Application,
            Category::ConfigWorkload,
        ];
        categories.sort();
        let ranks: Vec<u8> = categories.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn category_serializes_kebab_case() {
        let json = serde_json::to_string(&Category::ConfigWorkload).unwrap();
        assert_eq!(json, "\"config-workload\"");
        assert_eq!(Category::ConfigApp.to_string(), "config-app");
    }

    #[test]
    fn property_source_keeps_discovery_order() {
        let source = PropertySource::new(
            "image:application",
            Category::Application,
            [("z.key", json!("1")), ("a.key", json!("2"))],
        );
        let keys: Vec<&String> = source.properties().keys().collect();
        assert_eq!(keys, vec!["z.key", "a.key"]);
        assert_eq!(source.category_label(), "Application (image)");
    }

    #[test]
    fn property_source_wire_shape() {
        let source = PropertySource::new("x", Category::Bootstrap, [("a", json!(1))])
            .with_label("Bootstrap");
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["categoryKey"], "bootstrap");
        assert_eq!(value["categoryLabel"], "Bootstrap");
        assert_eq!(value["properties"]["a"], 1);
    }
}
