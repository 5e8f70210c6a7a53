//! YAML-like configuration parser
//!
//! Indentation-scoped flattening for the subset of YAML that Spring-style
//! configuration files use. Not a YAML implementation:
//! - list items (`- ...`) are skipped, never expanded into indexed keys
//! - everything after the first `#` on a line is dropped
//! - multi-document separators (`---`) are skipped like list items

use super::{strip_quotes, FlatProperties, TextParser};

/// Indentation-based flattening parser
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLikeParser;

impl TextParser for YamlLikeParser {
    fn parse(&self, content: &str) -> FlatProperties {
        let mut values = FlatProperties::new();
        // Open path segments with the indentation that opened them
        let mut path: Vec<(String, usize)> = Vec::new();

        for raw in content.lines() {
            let line = raw.find('#').map_or(raw, |idx| &raw[..idx]);
            if line.trim().is_empty() {
                continue;
            }
            let indent = line.len() - line.trim_start_matches(' ').len();
            let trimmed = line.trim();
            if trimmed.starts_with('-') {
                continue;
            }
            let (key, value) = match trimmed.split_once(':') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (trimmed, ""),
            };

            while path.last().is_some_and(|(_, open)| *open >= indent) {
                path.pop();
            }

            if value.is_empty() {
                path.push((key.to_string(), indent));
                continue;
            }

            let mut compound = String::new();
            for (segment, _) in &path {
                compound.push_str(segment);
                compound.push('.');
            }
            compound.push_str(key);
            values.insert(compound, strip_quotes(value).to_string());
        }
        values
    }

    fn extensions(&self) -> &[&str] {
        &["yml", "yaml"]
    }
}
