//! Report export
//!
//! Two lossless shapes:
//! - [`ReportRow`]: one flat row per match, per payload warning and per
//!   error entry
//! - [`ReportSnapshot`]: query, raw namespace results and the full ledger

use crate::error::ExportError;
use crate::identity::MatchIdentity;
use crate::ledger::{AnnotationLedger, AnnotationRecord, StoredAnnotation};
use cfgdrift_resolve::{
    CleanInstance, ErrorEntry, InstanceResult, MatchEntry, MatchOn, MatchScope, NamespaceResult,
    ParsePayloadWarning, ScanQuery, SearchMode, WorkloadKind, WorkloadRef,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tabular report row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Namespace
    pub namespace: String,
    /// Instance name (namespace name for namespace failures)
    pub instance: String,
    /// Instance kind
    pub kind: WorkloadKind,
    /// Matched key
    #[serde(default)]
    pub key: String,
    /// Matched value
    #[serde(default)]
    pub value: String,
    /// Source the value came from
    #[serde(default)]
    pub source: String,
    /// Field that matched; absent on error and warning rows
    #[serde(default)]
    pub match_on: Option<MatchOn>,
    /// Definition loses to a higher source
    #[serde(default)]
    pub overridden: bool,
    /// Annotation flag
    #[serde(default)]
    pub justified: bool,
    /// Annotation flag
    #[serde(default)]
    pub migration_required: bool,
    /// Annotation comment
    #[serde(default)]
    pub comment: String,
    /// Payload warning; present on warning rows only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<ParsePayloadWarning>,
    /// Failure message; present on error rows only
    #[serde(default)]
    pub error: Option<String>,
}

impl ReportRow {
    fn blank(namespace: &str, instance: &str, kind: &WorkloadKind) -> Self {
        Self {
            namespace: namespace.to_string(),
            instance: instance.to_string(),
            kind: kind.clone(),
            key: String::new(),
            value: String::new(),
            source: String::new(),
            match_on: None,
            overridden: false,
            justified: false,
            migration_required: false,
            comment: String::new(),
            warning: None,
            error: None,
        }
    }

    /// Whether this row stands for a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether this row carries a payload warning
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.warning.is_some()
    }

    /// Annotation carried by the row
    #[must_use]
    pub fn record(&self) -> AnnotationRecord {
        AnnotationRecord {
            justified: self.justified,
            migration_required: self.migration_required,
            comment: self.comment.clone(),
        }
    }

    /// Identity the row's annotation belongs to
    #[must_use]
    pub fn identity(&self) -> MatchIdentity {
        match self.match_entry() {
            Some(entry) if !self.is_error() => {
                MatchIdentity::for_match(&self.namespace, &self.instance, &entry)
            }
            _ => MatchIdentity::for_instance(&self.namespace, &self.instance),
        }
    }

    fn match_entry(&self) -> Option<MatchEntry> {
        self.match_on.map(|match_on| MatchEntry {
            key: self.key.clone(),
            value: self.value.clone(),
            source: self.source.clone(),
            match_on,
            overridden: self.overridden,
        })
    }

    fn annotated(mut self, record: AnnotationRecord) -> Self {
        self.justified = record.justified;
        self.migration_required = record.migration_required;
        self.comment = record.comment;
        self
    }
}

fn warning_rows<'a>(
    namespace: &'a str,
    instance: &'a str,
    kind: &'a WorkloadKind,
    warnings: &'a [ParsePayloadWarning],
) -> impl Iterator<Item = ReportRow> + 'a {
    warnings.iter().map(move |warning| ReportRow {
        warning: Some(warning.clone()),
        ..ReportRow::blank(namespace, instance, kind)
    })
}

/// Flatten results into rows, annotated from the ledger
///
/// Warning rows follow their instance's matches and carry no annotation.
/// Clean instances without warnings produce no row.
#[must_use]
pub fn rows_from_results(results: &[NamespaceResult], ledger: &AnnotationLedger) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for result in results {
        let ns = result.namespace.as_str();
        for instance in &result.matched {
            let name = instance.workload_name.as_str();
            for entry in &instance.matches {
                let identity = MatchIdentity::for_match(ns, name, entry);
                let row = ReportRow {
                    key: entry.key.clone(),
                    value: entry.value.clone(),
                    source: entry.source.clone(),
                    match_on: Some(entry.match_on),
                    overridden: entry.overridden,
                    ..ReportRow::blank(ns, name, &instance.workload_kind)
                };
                rows.push(row.annotated(ledger.lookup(&identity)));
            }
            rows.extend(warning_rows(ns, name, &instance.workload_kind, &instance.warnings));
        }
        for clean in &result.clean {
            rows.extend(warning_rows(
                ns,
                &clean.workload_name,
                &clean.workload_kind,
                &clean.warnings,
            ));
        }
        for error in &result.errors {
            let identity = MatchIdentity::for_instance(ns, &error.workload_name);
            let row = ReportRow {
                error: Some(error.message.clone()),
                ..ReportRow::blank(ns, &error.workload_name, &error.workload_kind)
            };
            rows.push(row.annotated(ledger.lookup(&identity)));
        }
    }
    rows
}

/// Rebuild namespace results from rows
///
/// An instance with warning rows but no match rows comes back as a clean
/// entry. Rows carry no instance count, so `scanned` is set to the number
/// of distinct instances listed.
///
/// # Errors
/// `ExportError::IncompleteRow` for a row with no match, warning or error.
pub fn results_from_rows(rows: &[ReportRow]) -> Result<Vec<NamespaceResult>, ExportError> {
    let mut namespaces: BTreeMap<&str, NamespaceResult> = BTreeMap::new();
    let mut instances: BTreeMap<(&str, &str), InstanceResult> = BTreeMap::new();

    for row in rows {
        let result = namespaces
            .entry(row.namespace.as_str())
            .or_insert_with(|| NamespaceResult::new(row.namespace.clone()));
        if let Some(message) = &row.error {
            result.errors.push(ErrorEntry {
                workload_name: row.instance.clone(),
                workload_kind: row.kind.clone(),
                message: message.clone(),
            });
            continue;
        }
        let instance = instances
            .entry((row.namespace.as_str(), row.instance.as_str()))
            .or_insert_with(|| {
                let workload = WorkloadRef::new(row.instance.clone(), row.kind.clone());
                InstanceResult::new(&workload, Vec::new())
            });
        if let Some(warning) = &row.warning {
            instance.warnings.push(warning.clone());
            continue;
        }
        let entry = row.match_entry().ok_or_else(|| ExportError::IncompleteRow {
            namespace: row.namespace.clone(),
            instance: row.instance.clone(),
        })?;
        instance.matches.push(entry);
    }

    for ((namespace, _), mut instance) in instances {
        let Some(result) = namespaces.get_mut(namespace) else {
            continue;
        };
        if instance.matches.is_empty() {
            result.clean.push(CleanInstance {
                workload_name: instance.workload_name,
                workload_kind: instance.workload_kind,
                warnings: instance.warnings,
            });
        } else {
            instance.matches.sort_by(|a, b| a.key.cmp(&b.key));
            result.matched.push(instance);
        }
    }

    Ok(namespaces
        .into_values()
        .map(|mut result| {
            result.sort();
            result.scanned = result.matched.len()
                + result.clean.len()
                + result.errors.iter().filter(|e| !e.is_namespace_failure()).count();
            result
        })
        .collect())
}

/// Rebuild a ledger from the annotations carried by rows
///
/// Blank annotations are skipped.
#[must_use]
pub fn ledger_from_rows(rows: &[ReportRow]) -> AnnotationLedger {
    let mut ledger = AnnotationLedger::new();
    for row in rows {
        let record = row.record();
        if !record.is_blank() {
            ledger.put(&row.identity(), record);
        }
    }
    ledger
}

/// Structured report: the query, raw results and every annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    /// Pattern scanned for
    pub pattern: String,
    /// Case-insensitive matching
    pub case_insensitive: bool,
    /// Match scope
    pub scope: MatchScope,
    /// Search mode
    #[serde(default)]
    pub mode: SearchMode,
    /// Namespaces scanned
    pub namespaces: Vec<String>,
    /// Raw per-namespace results
    pub results: Vec<NamespaceResult>,
    /// Ledger contents
    #[serde(default)]
    pub annotations: Vec<StoredAnnotation>,
}

impl ReportSnapshot {
    /// Capture a finished scan
    #[must_use]
    pub fn capture(
        query: &ScanQuery,
        results: &[NamespaceResult],
        ledger: &AnnotationLedger,
    ) -> Self {
        Self {
            pattern: query.pattern.clone(),
            case_insensitive: query.case_insensitive,
            scope: query.scope,
            mode: query.mode,
            namespaces: query.namespaces.clone(),
            results: results.to_vec(),
            annotations: ledger.snapshot(),
        }
    }

    /// The query that produced this snapshot
    #[must_use]
    pub fn query(&self) -> ScanQuery {
        ScanQuery {
            pattern: self.pattern.clone(),
            case_insensitive: self.case_insensitive,
            scope: self.scope,
            mode: self.mode,
            namespaces: self.namespaces.clone(),
        }
    }

    /// Merge the snapshot's annotations into a ledger
    pub fn restore(&self, ledger: &mut AnnotationLedger) {
        ledger.restore(self.annotations.iter().cloned());
    }

    /// Encode as pretty JSON
    ///
    /// # Errors
    /// Returns `ExportError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON
    ///
    /// # Errors
    /// Returns `ExportError::Serialization` on malformed input.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}
