//! Precedence resolution
//!
//! Sources arrive highest precedence first. For every key the first source
//! that defines it wins; later definitions are overridden. Values are left
//! untouched apart from unwrapping the `{value: ...}` wrapper actuator
//! payloads use.

use cfgdrift_source::{Category, PropertySource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Winning definition of one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveEntry {
    /// Position of the winning source in the precedence list
    pub source_index: usize,
    /// Name of the winning source
    pub source_name: String,
    /// Winning value, unwrapped
    pub value: Value,
}

/// Key → winning definition, for one ordered source list
///
/// Keys iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveIndex {
    entries: BTreeMap<String, EffectiveEntry>,
}

impl EffectiveIndex {
    /// Resolve an ordered source list in one pass
    #[must_use]
    pub fn resolve(sources: &[PropertySource]) -> Self {
        let mut entries = BTreeMap::new();
        for (source_index, source) in sources.iter().enumerate() {
            for (key, raw) in source.properties() {
                entries.entry(key.clone()).or_insert_with(|| EffectiveEntry {
                    source_index,
                    source_name: source.name().to_string(),
                    value: unwrap_value(raw).clone(),
                });
            }
        }
        tracing::trace!(sources = sources.len(), keys = entries.len(), "resolved effective index");
        Self { entries }
    }

    /// Winning definition of a key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EffectiveEntry> {
        self.entries.get(key)
    }

    /// Whether any source defines the key
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EffectiveEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no source defines anything
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the definition of `key` in source `source_index` loses
    #[must_use]
    pub fn is_overridden(&self, key: &str, source_index: usize) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.source_index != source_index)
    }

    /// Every definition of `key`, winner first
    #[must_use]
    pub fn explain(sources: &[PropertySource], key: &str) -> Vec<Definition> {
        sources
            .iter()
            .enumerate()
            .filter_map(|(source_index, source)| {
                source.get(key).map(|raw| (source_index, source, raw))
            })
            .enumerate()
            .map(|(rank, (source_index, source, raw))| Definition {
                source_index,
                source_name: source.name().to_string(),
                category: source.category(),
                value: unwrap_value(raw).clone(),
                overridden: rank > 0,
            })
            .collect()
    }

    /// Entries of one source, each flagged when a higher source wins
    ///
    /// Empty when `source_index` is out of range.
    #[must_use]
    pub fn source_view(&self, sources: &[PropertySource], source_index: usize) -> Vec<SourceEntry> {
        let Some(source) = sources.get(source_index) else {
            return Vec::new();
        };
        source
            .properties()
            .iter()
            .map(|(key, raw)| SourceEntry {
                key: key.clone(),
                value: unwrap_value(raw).clone(),
                overridden: self.is_overridden(key, source_index),
            })
            .collect()
    }
}

/// One definition of a key in one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Position of the source in the precedence list
    pub source_index: usize,
    /// Source name
    pub source_name: String,
    /// Source category
    pub category: Category,
    /// Value in this source, unwrapped
    pub value: Value,
    /// Whether a higher source defines the key too
    pub overridden: bool,
}

/// One key of a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Property key
    pub key: String,
    /// Value, unwrapped
    pub value: Value,
    /// Whether a higher source wins for this key
    pub overridden: bool,
}

/// Stable-sort sources into precedence order by category rank
pub fn order_sources(sources: &mut [PropertySource]) {
    sources.sort_by_key(|source| source.category().rank());
}

/// Strip a `{value: ...}` wrapper, if present
#[must_use]
pub fn unwrap_value(raw: &Value) -> &Value {
    match raw {
        Value::Object(map) => map.get("value").unwrap_or(raw),
        other => other,
    }
}

/// Render a value for matching and display
///
/// Strings verbatim, `null` as empty, anything else as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
