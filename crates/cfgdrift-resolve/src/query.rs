//! Scan query parameters

use crate::error::InvalidPatternError;
use crate::extract::SearchMode;
use crate::matcher::{MatchScope, Matcher};
use serde::{Deserialize, Serialize};

/// What an operator asked to scan for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanQuery {
    /// Regular expression
    pub pattern: String,
    /// Ignore case when matching
    #[serde(default)]
    pub case_insensitive: bool,
    /// Fields the pattern is tested against
    #[serde(default)]
    pub scope: MatchScope,
    /// Winning values only, or every definition
    #[serde(default)]
    pub mode: SearchMode,
    /// Target namespaces
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl ScanQuery {
    /// Query for a pattern with default scope and mode
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Set case-insensitive matching
    #[must_use]
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Set the match scope
    #[must_use]
    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the search mode
    #[must_use]
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set target namespaces
    #[must_use]
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the pattern with this query's case and scope settings
    ///
    /// # Errors
    /// Returns `InvalidPatternError` if the pattern does not compile.
    pub fn compile_matcher(&self) -> Result<Matcher, InvalidPatternError> {
        Ok(Matcher::compile(&self.pattern, self.case_insensitive)?.with_scope(self.scope))
    }
}
