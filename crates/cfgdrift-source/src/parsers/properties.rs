//! `.properties` parser
//!
//! Line-oriented `key=value` / `key:value`. Comments start with `#` or `!`.

use super::{strip_quotes, FlatProperties, TextParser};

/// Java-style properties parser
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesParser;

impl TextParser for PropertiesParser {
    fn parse(&self, content: &str) -> FlatProperties {
        let mut values = FlatProperties::new();
        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(idx) = line.find('=').or_else(|| line.find(':')) else {
                continue;
            };
            let key = line[..idx].trim();
            let value = line[idx + 1..].trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            values.insert(key.to_string(), strip_quotes(value).to_string());
        }
        values
    }

    fn extensions(&self) -> &[&str] {
        &["properties"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_separators() {
        let parsed = PropertiesParser.parse("a.b=1\nc.d: two\n");
        assert_eq!(parsed.get("a.b").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("c.d").map(String::as_str), Some("two"));
    }

    #[test]
    fn equals_wins_over_colon() {
        let parsed = PropertiesParser.parse("db.url=jdbc:postgresql://db:5432/app");
        assert_eq!(
            parsed.get("db.url").map(String::as_str),
            Some("jdbc:postgresql://db:5432/app")
        );
    }

    #[test]
    fn skips_comments_blanks_and_empty_values() {
        let content =
            "# comment\n! bang comment\n\n   \nempty=\nnoseparator\n=novalue\nkept = yes \r\n";
        let parsed = PropertiesParser.parse(content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("kept").map(String::as_str), Some("yes"));
    }

    #[test]
    fn strips_surrounding_quotes() {
        let parsed = PropertiesParser.parse("name=\"billing\"\nother='x'");
        assert_eq!(parsed.get("name").map(String::as_str), Some("billing"));
        assert_eq!(parsed.get("other").map(String::as_str), Some("x"));
    }

    #[test]
    fn later_duplicate_overwrites() {
        let parsed = PropertiesParser.parse("a=1\nb=2\na=3");
        assert_eq!(parsed.get("a").map(String::as_str), Some("3"));
        assert_eq!(parsed.keys().next().map(String::as_str), Some("a"));
    }
}
