//! Match extraction from ranked sources

use crate::effective::{display_value, unwrap_value, EffectiveIndex};
use crate::matcher::Matcher;
use crate::report::MatchEntry;
use cfgdrift_source::PropertySource;
use serde::{Deserialize, Serialize};

/// What the pattern is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Winning value per key
    #[default]
    Effective,
    /// Every definition in every source
    AllSources,
}

/// Collect matches from an ordered source list, sorted by key
///
/// In [`SearchMode::AllSources`] a key defined by several sources yields one
/// entry per definition in precedence order, losers flagged `overridden`.
#[must_use]
pub fn find_matches(
    sources: &[PropertySource],
    matcher: &Matcher,
    mode: SearchMode,
) -> Vec<MatchEntry> {
    let index = EffectiveIndex::resolve(sources);
    match mode {
        SearchMode::Effective => index
            .iter()
            .filter_map(|(key, entry)| {
                let value = display_value(&entry.value);
                matcher.match_on(key, &value).map(|match_on| MatchEntry {
                    key: key.to_string(),
                    value,
                    source: entry.source_name.clone(),
                    match_on,
                    overridden: false,
                })
            })
            .collect(),
        SearchMode::AllSources => {
            let index = &index;
            let mut matches: Vec<MatchEntry> = sources
                .iter()
                .enumerate()
                .flat_map(move |(source_index, source)| {
                    source.properties().iter().filter_map(move |(key, raw)| {
                        let value = display_value(unwrap_value(raw));
                        matcher.match_on(key, &value).map(|match_on| MatchEntry {
                            key: key.clone(),
                            value,
                            source: source.name().to_string(),
                            match_on,
                            overridden: index.is_overridden(key, source_index),
                        })
                    })
                })
                .collect();
            matches.sort_by(|a, b| a.key.cmp(&b.key));
            matches
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchOn, MatchScope};
    use cfgdrift_source::Category;
    use serde_json::json;

    fn sources() -> Vec<PropertySource> {
        vec![
            PropertySource::new(
                "billing.yml",
                Category::ConfigWorkload,
                [("db.url", json!("jdbc:postgresql://prod-db/billing"))],
            ),
            PropertySource::new(
                "image:application",
                Category::Application,
                [
                    ("db.url", json!("jdbc:h2:mem")),
                    ("db.pool", json!({"value": 10})),
                    ("zeta", json!(null)),
                ],
            ),
        ]
    }

    #[test]
    fn effective_mode_reports_winners_only() {
        let matcher = Matcher::compile("db", false).unwrap();
        let matches = find_matches(&sources(), &matcher, SearchMode::Effective);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].key, "db.pool");
        assert_eq!(matches[0].value, "10");
        assert_eq!(matches[1].key, "db.url");
        assert_eq!(matches[1].source, "billing.yml");
        assert!(matches.iter().all(|m| !m.overridden));
    }

    #[test]
    fn all_sources_mode_flags_overridden_definitions() {
        let matcher = Matcher::compile("^db\\.url$", false).unwrap();
        let matches = find_matches(&sources(), &matcher, SearchMode::AllSources);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].source, "billing.yml");
        assert!(!matches[0].overridden);
        assert_eq!(matches[1].source, "image:application");
        assert!(matches[1].overridden);
    }

    #[test]
    fn value_scope_and_match_on() {
        let matcher = Matcher::compile("prod-db", false)
            .unwrap()
            .with_scope(MatchScope::Value);
        let matches = find_matches(&sources(), &matcher, SearchMode::Effective);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_on, MatchOn::Value);
    }

    #[test]
    fn null_values_match_as_empty_string() {
        let matcher = Matcher::compile("^$", false)
            .unwrap()
            .with_scope(MatchScope::Value);
        let matches = find_matches(&sources(), &matcher, SearchMode::Effective);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "zeta");
        assert_eq!(matches[0].value, "");
    }

    #[test]
    fn search_mode_wire_names() {
        assert_eq!(serde_json::to_string(&SearchMode::AllSources).unwrap(), "\"all-sources\"");
    }
}
