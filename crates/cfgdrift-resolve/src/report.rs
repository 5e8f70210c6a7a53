//! Scan result model
//!
//! Per-instance match lists, error entries and the per-namespace aggregate.
//! Everything serializes camelCase for reports and snapshots.

use crate::matcher::MatchOn;
use cfgdrift_source::ParsePayloadWarning;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of deployable unit, as reported by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkloadKind {
    /// `deployment`
    Deployment,
    /// `deploymentconfig`
    DeploymentConfig,
    /// Synthetic kind for namespace-level failures
    Namespace,
    /// Anything else, preserved verbatim
    Other(String),
}

impl WorkloadKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deployment => "deployment",
            Self::DeploymentConfig => "deploymentconfig",
            Self::Namespace => "namespace",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for WorkloadKind {
    fn from(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "deployment" => Self::Deployment,
            "deploymentconfig" => Self::DeploymentConfig,
            "namespace" => Self::Namespace,
            _ => Self::Other(kind.to_string()),
        }
    }
}

impl From<String> for WorkloadKind {
    fn from(kind: String) -> Self {
        Self::from(kind.as_str())
    }
}

impl From<WorkloadKind> for String {
    fn from(kind: WorkloadKind) -> Self {
        match kind {
            WorkloadKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enumerated instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    /// Instance name
    pub name: String,
    /// Instance kind
    pub kind: WorkloadKind,
}

impl WorkloadRef {
    /// Create a reference
    pub fn new(name: impl Into<String>, kind: impl Into<WorkloadKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// One key that satisfied the pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Property key
    pub key: String,
    /// Stringified value
    pub value: String,
    /// Name of the source the value came from
    pub source: String,
    /// Field that satisfied the pattern
    pub match_on: MatchOn,
    /// Definition loses to a higher source (all-sources mode only)
    #[serde(default)]
    pub overridden: bool,
}

/// Matches found in one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResult {
    /// Instance name
    pub workload_name: String,
    /// Instance kind
    pub workload_kind: WorkloadKind,
    /// Matches sorted by key
    pub matches: Vec<MatchEntry>,
    /// Non-fatal payload problems
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParsePayloadWarning>,
}

impl InstanceResult {
    /// Build a result, sorting matches by key
    #[must_use]
    pub fn new(workload: &WorkloadRef, mut matches: Vec<MatchEntry>) -> Self {
        matches.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            workload_name: workload.name.clone(),
            workload_kind: workload.kind.clone(),
            matches,
            warnings: Vec::new(),
        }
    }

    /// Attach payload warnings
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<ParsePayloadWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// An instance that was scanned without a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanInstance {
    /// Instance name
    pub workload_name: String,
    /// Instance kind
    pub workload_kind: WorkloadKind,
    /// Non-fatal payload problems
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParsePayloadWarning>,
}

impl CleanInstance {
    /// Clean outcome carrying whatever the payload warned about
    #[must_use]
    pub fn new(workload: &WorkloadRef, warnings: Vec<ParsePayloadWarning>) -> Self {
        Self {
            workload_name: workload.name.clone(),
            workload_kind: workload.kind.clone(),
            warnings,
        }
    }
}

/// A contained failure for one instance, or a whole namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// Instance name (the namespace name for namespace-level failures)
    pub workload_name: String,
    /// Instance kind (`namespace` for namespace-level failures)
    pub workload_kind: WorkloadKind,
    /// Human-readable failure
    pub message: String,
}

impl ErrorEntry {
    /// Failure of one instance
    pub fn instance(workload: &WorkloadRef, message: impl Into<String>) -> Self {
        Self {
            workload_name: workload.name.clone(),
            workload_kind: workload.kind.clone(),
            message: message.into(),
        }
    }

    /// Failure to enumerate a namespace
    pub fn namespace(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            workload_name: namespace.into(),
            workload_kind: WorkloadKind::Namespace,
            message: message.into(),
        }
    }

    /// Whether this entry stands for a whole namespace
    #[must_use]
    pub fn is_namespace_failure(&self) -> bool {
        self.workload_kind == WorkloadKind::Namespace
    }
}

/// Result of scanning one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceOutcome {
    /// At least one match
    Matched(InstanceResult),
    /// Scanned successfully, nothing matched
    Clean(CleanInstance),
    /// Fetch or decode failed
    Failed(ErrorEntry),
}

impl InstanceOutcome {
    /// Instance name
    #[must_use]
    pub fn workload_name(&self) -> &str {
        match self {
            Self::Matched(result) => &result.workload_name,
            Self::Clean(clean) => &clean.workload_name,
            Self::Failed(error) => &error.workload_name,
        }
    }
}

/// Aggregate for one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceResult {
    /// Namespace name
    pub namespace: String,
    /// Instances with at least one match, sorted by name
    pub matched: Vec<InstanceResult>,
    /// Failures, sorted by name
    pub errors: Vec<ErrorEntry>,
    /// Instances without a match, sorted by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clean: Vec<CleanInstance>,
    /// Instances enumerated
    #[serde(default)]
    pub scanned: usize,
}

impl NamespaceResult {
    /// Empty result for a namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Result for a namespace whose enumeration failed
    pub fn enumeration_failed(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            errors: vec![ErrorEntry::namespace(namespace.clone(), message)],
            namespace,
            ..Self::default()
        }
    }

    /// Record one instance outcome without sorting
    pub fn push(&mut self, outcome: InstanceOutcome) {
        match outcome {
            InstanceOutcome::Matched(result) => self.matched.push(result),
            InstanceOutcome::Clean(clean) => self.clean.push(clean),
            InstanceOutcome::Failed(error) => self.errors.push(error),
        }
    }

    /// Sort instances and errors by name
    pub fn sort(&mut self) {
        self.matched
            .sort_by(|a, b| a.workload_name.cmp(&b.workload_name));
        self.errors
            .sort_by(|a, b| a.workload_name.cmp(&b.workload_name));
        self.clean
            .sort_by(|a, b| a.workload_name.cmp(&b.workload_name));
    }

    /// Replace whatever is recorded for an instance with a fresh outcome
    ///
    /// Other instances are left untouched and the sort order is restored.
    pub fn upsert(&mut self, outcome: InstanceOutcome) {
        let name = outcome.workload_name().to_string();
        self.matched.retain(|r| r.workload_name != name);
        self.errors
            .retain(|e| e.is_namespace_failure() || e.workload_name != name);
        self.clean.retain(|c| c.workload_name != name);
        self.push(outcome);
        self.sort();
    }

    /// Matched result for an instance
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<&InstanceResult> {
        self.matched.iter().find(|r| r.workload_name == name)
    }

    /// Error entry for an instance
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&ErrorEntry> {
        self.errors.iter().find(|e| e.workload_name == name)
    }

    /// Clean entry for an instance
    #[must_use]
    pub fn clean_instance(&self, name: &str) -> Option<&CleanInstance> {
        self.clean.iter().find(|c| c.workload_name == name)
    }

    /// Whether any outcome is recorded for an instance
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instance(name).is_some()
            || self.clean_instance(name).is_some()
            || self
                .errors
                .iter()
                .any(|e| !e.is_namespace_failure() && e.workload_name == name)
    }

    /// Payload warnings across matched and clean instances
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &ParsePayloadWarning)> {
        let matched = self
            .matched
            .iter()
            .flat_map(|r| r.warnings.iter().map(move |w| (r.workload_name.as_str(), w)));
        let clean = self
            .clean
            .iter()
            .flat_map(|c| c.warnings.iter().map(move |w| (c.workload_name.as_str(), w)));
        matched.chain(clean)
    }

    /// Total matches across instances
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matched.iter().map(|r| r.matches.len()).sum()
    }
}
