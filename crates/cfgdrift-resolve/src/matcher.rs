//! Pattern matching over keys and values

use crate::error::InvalidPatternError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Which fields a pattern is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// Keys only
    Key,
    /// Values only
    Value,
    /// Key first, then value
    #[default]
    Both,
}

impl MatchScope {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Value => "value",
            Self::Both => "both",
        }
    }

    const fn includes_key(self) -> bool {
        matches!(self, Self::Key | Self::Both)
    }

    const fn includes_value(self) -> bool {
        matches!(self, Self::Value | Self::Both)
    }
}

impl fmt::Display for MatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The field that satisfied a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOn {
    /// Matched on the key
    Key,
    /// Matched on the value
    Value,
}

impl MatchOn {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for MatchOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled operator pattern
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    pattern: String,
    case_insensitive: bool,
    scope: MatchScope,
}

impl Matcher {
    /// Compile a regular expression, scoped to keys and values
    ///
    /// # Errors
    /// Returns `InvalidPatternError` carrying the regex syntax error.
    pub fn compile(pattern: &str, case_insensitive: bool) -> Result<Self, InvalidPatternError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|err| InvalidPatternError::from_regex(pattern, &err))?;
        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            case_insensitive,
            scope: MatchScope::default(),
        })
    }

    /// Restrict the fields tested
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Source pattern
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether matching ignores case
    #[inline]
    #[must_use]
    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Fields tested
    #[inline]
    #[must_use]
    pub fn scope(&self) -> MatchScope {
        self.scope
    }

    /// Whether the pattern occurs anywhere in `text`
    #[inline]
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Whether a key/value pair satisfies the pattern within scope
    #[inline]
    #[must_use]
    pub fn test(&self, key: &str, value: &str) -> bool {
        self.match_on(key, value).is_some()
    }

    /// First field (key before value) that satisfies the pattern
    #[must_use]
    pub fn match_on(&self, key: &str, value: &str) -> Option<MatchOn> {
        if self.scope.includes_key() && self.is_match(key) {
            Some(MatchOn::Key)
        } else if self.scope.includes_value() && self.is_match(value) {
            Some(MatchOn::Value)
        } else {
            None
        }
    }

    /// Non-overlapping, non-empty match spans as byte ranges
    #[must_use]
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.regex
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| m.range())
            .collect()
    }

    /// Wrap every matched span in `open` / `close`
    #[must_use]
    pub fn highlight(&self, text: &str, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for span in self.spans(text) {
            out.push_str(&text[last..span.start]);
            out.push_str(open);
            out.push_str(&text[span.clone()]);
            out.push_str(close);
            last = span.end;
        }
        out.push_str(&text[last..]);
        out
    }
}
