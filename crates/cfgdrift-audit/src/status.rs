//! Review status rollups
//!
//! Statuses are derived from the ledger on every call and never stored.

use crate::identity::MatchIdentity;
use crate::ledger::{AnnotationLedger, AnnotationRecord};
use cfgdrift_resolve::{ErrorEntry, InstanceResult, NamespaceResult, WorkloadKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review status of an instance or namespace
///
/// Declaration order is rollup precedence: the smallest status present wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    /// Something must be migrated
    Migration,
    /// Something is not reviewed yet
    NotWorked,
    /// A failed instance nobody has reviewed
    Skipped,
    /// Everything is justified
    Justified,
}

impl ReviewStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Migration => "migration",
            Self::NotWorked => "not-worked",
            Self::Skipped => "skipped",
            Self::Justified => "justified",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combine statuses; an empty set is `Justified`
pub fn rollup(statuses: impl IntoIterator<Item = ReviewStatus>) -> ReviewStatus {
    statuses.into_iter().min().unwrap_or(ReviewStatus::Justified)
}

/// Status of an instance from its match records
///
/// An instance without matches is vacuously `Justified`.
#[must_use]
pub fn instance_status(
    namespace: &str,
    result: &InstanceResult,
    ledger: &AnnotationLedger,
) -> ReviewStatus {
    let records: Vec<AnnotationRecord> = result
        .matches
        .iter()
        .map(|entry| {
            ledger.lookup(&MatchIdentity::for_match(namespace, &result.workload_name, entry))
        })
        .collect();

    if records.iter().any(|r| r.migration_required) {
        ReviewStatus::Migration
    } else if records.iter().any(|r| !r.justified) {
        ReviewStatus::NotWorked
    } else {
        ReviewStatus::Justified
    }
}

/// Status of a failed instance from its skip-level record
#[must_use]
pub fn failed_status(
    namespace: &str,
    error: &ErrorEntry,
    ledger: &AnnotationLedger,
) -> ReviewStatus {
    let record = ledger.lookup(&MatchIdentity::for_instance(namespace, &error.workload_name));
    if record.migration_required {
        ReviewStatus::Migration
    } else if record.justified {
        ReviewStatus::Justified
    } else {
        ReviewStatus::Skipped
    }
}

/// Status of a namespace across matched and failed instances
#[must_use]
pub fn namespace_status(result: &NamespaceResult, ledger: &AnnotationLedger) -> ReviewStatus {
    let matched = result
        .matched
        .iter()
        .map(|r| instance_status(&result.namespace, r, ledger));
    let failed = result
        .errors
        .iter()
        .map(|e| failed_status(&result.namespace, e, ledger));
    rollup(matched.chain(failed))
}

/// Per-status tallies for charts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// `migration`
    pub migration: usize,
    /// `not-worked`
    pub not_worked: usize,
    /// `skipped`
    pub skipped: usize,
    /// `justified`
    pub justified: usize,
}

impl StatusCounts {
    /// Count one status
    pub fn record(&mut self, status: ReviewStatus) {
        match status {
            ReviewStatus::Migration => self.migration += 1,
            ReviewStatus::NotWorked => self.not_worked += 1,
            ReviewStatus::Skipped => self.skipped += 1,
            ReviewStatus::Justified => self.justified += 1,
        }
    }

    /// Tally of a given status
    #[must_use]
    pub const fn get(&self, status: ReviewStatus) -> usize {
        match status {
            ReviewStatus::Migration => self.migration,
            ReviewStatus::NotWorked => self.not_worked,
            ReviewStatus::Skipped => self.skipped,
            ReviewStatus::Justified => self.justified,
        }
    }

    /// Sum of all tallies
    #[must_use]
    pub const fn total(&self) -> usize {
        self.migration + self.not_worked + self.skipped + self.justified
    }

    /// Namespace statuses across summaries
    #[must_use]
    pub fn of_namespaces(summaries: &[NamespaceSummary]) -> Self {
        summaries.iter().map(|s| s.status).collect()
    }
}

impl FromIterator<ReviewStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = ReviewStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}

/// Status of one instance in a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    /// Instance name
    pub workload_name: String,
    /// Instance kind
    pub workload_kind: WorkloadKind,
    /// Derived status
    pub status: ReviewStatus,
    /// Match count (zero for failures)
    pub matches: usize,
    /// Whether the instance failed to scan
    pub failed: bool,
}

/// Rollup of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    /// Namespace name
    pub namespace: String,
    /// Namespace status
    pub status: ReviewStatus,
    /// Instance statuses, matched first then failed, each sorted by name
    pub instances: Vec<InstanceSummary>,
    /// Instance status tallies
    pub counts: StatusCounts,
    /// Total matches
    pub match_count: usize,
}

/// Derive summaries for a set of namespace results
#[must_use]
pub fn summarize(results: &[NamespaceResult], ledger: &AnnotationLedger) -> Vec<NamespaceSummary> {
    results
        .iter()
        .map(|result| {
            let ns = result.namespace.as_str();
            let instances: Vec<InstanceSummary> = result
                .matched
                .iter()
                .map(|r| InstanceSummary {
                    workload_name: r.workload_name.clone(),
                    workload_kind: r.workload_kind.clone(),
                    status: instance_status(ns, r, ledger),
                    matches: r.matches.len(),
                    failed: false,
                })
                .chain(result.errors.iter().map(|e| InstanceSummary {
                    workload_name: e.workload_name.clone(),
                    workload_kind: e.workload_kind.clone(),
                    status: failed_status(ns, e, ledger),
                    matches: 0,
                    failed: true,
                }))
                .collect();
            let counts: StatusCounts = instances.iter().map(|i| i.status).collect();
            NamespaceSummary {
                namespace: result.namespace.clone(),
                status: rollup(instances.iter().map(|i| i.status)),
                match_count: result.match_count(),
                instances,
                counts,
            }
        })
        .collect()
}
