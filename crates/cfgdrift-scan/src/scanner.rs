//! Scan orchestration
//!
//! Namespaces fan out through a bounded stream, and so do the instances of
//! each namespace. Completion order is never observable: every aggregate is
//! sorted before it is returned. Failures are contained at the smallest
//! scope, one instance or one namespace, so a scan always yields a
//! best-effort report.

use crate::collab::{PayloadFetcher, WorkloadInventory};
use crate::config::ScanConfig;
use crate::error::{FetchError, ScanError};
use crate::retry::fetch_with_retry;
use cfgdrift_resolve::{
    find_matches, CleanInstance, ErrorEntry, InstanceOutcome, InstanceResult, Matcher,
    NamespaceResult, ScanQuery, SearchMode, WorkloadRef,
};
use cfgdrift_source::{normalize, NormalizeOptions, RawPayload};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

/// Outcome of a multi-namespace scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Query that was run
    pub query: ScanQuery,
    /// One result per namespace, sorted by namespace
    pub results: Vec<NamespaceResult>,
}

impl ScanReport {
    /// Result of one namespace
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&NamespaceResult> {
        self.results.iter().find(|r| r.namespace == name)
    }

    /// Mutable result of one namespace, for re-scans
    pub fn namespace_mut(&mut self, name: &str) -> Option<&mut NamespaceResult> {
        self.results.iter_mut().find(|r| r.namespace == name)
    }

    /// Matches across all namespaces
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.results.iter().map(NamespaceResult::match_count).sum()
    }

    /// Error entries across all namespaces
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.results.iter().map(|r| r.errors.len()).sum()
    }
}

/// Drives scans against injected collaborators
#[derive(Clone)]
pub struct Scanner {
    inventory: Arc<dyn WorkloadInventory>,
    fetcher: Arc<dyn PayloadFetcher>,
    config: ScanConfig,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Scanner with default configuration
    pub fn new(inventory: Arc<dyn WorkloadInventory>, fetcher: Arc<dyn PayloadFetcher>) -> Self {
        Self {
            inventory,
            fetcher,
            config: ScanConfig::default(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every namespace of a query
    ///
    /// # Errors
    /// `ScanError::InvalidPattern` before any enumeration or fetch is issued.
    pub async fn scan(&self, query: &ScanQuery) -> Result<ScanReport, ScanError> {
        let matcher = query.compile_matcher()?;

        let mut namespaces = query.namespaces.clone();
        namespaces.sort();
        namespaces.dedup();
        tracing::info!(
            pattern = %query.pattern,
            scope = %query.scope,
            namespaces = namespaces.len(),
            "starting scan"
        );

        let mut results: Vec<NamespaceResult> = stream::iter(namespaces)
            .map(|namespace| self.run_namespace(namespace, &matcher, query.mode))
            .buffer_unordered(self.config.namespace_concurrency.max(1))
            .collect()
            .await;
        results.sort_by(|a, b| a.namespace.cmp(&b.namespace));

        let report = ScanReport {
            query: query.clone(),
            results,
        };
        tracing::info!(
            matches = report.match_count(),
            errors = report.error_count(),
            "scan finished"
        );
        Ok(report)
    }

    /// Scan a single namespace
    ///
    /// # Errors
    /// `ScanError::InvalidPattern` if the query's pattern does not compile.
    pub async fn scan_namespace(
        &self,
        namespace: &str,
        query: &ScanQuery,
    ) -> Result<NamespaceResult, ScanError> {
        let matcher = query.compile_matcher()?;
        Ok(self.run_namespace(namespace.to_string(), &matcher, query.mode).await)
    }

    /// Re-scan one instance and splice the outcome into `result`
    ///
    /// Whatever was recorded for the instance is replaced; other instances
    /// are untouched and the sort order is kept. Only an instance with no
    /// prior outcome raises `scanned`.
    ///
    /// # Errors
    /// `ScanError::InvalidPattern` if the query's pattern does not compile.
    pub async fn rescan_instance(
        &self,
        result: &mut NamespaceResult,
        workload: &WorkloadRef,
        query: &ScanQuery,
    ) -> Result<InstanceOutcome, ScanError> {
        let matcher = query.compile_matcher()?;
        let namespace = result.namespace.clone();
        let outcome = self
            .scan_instance(&namespace, workload, &matcher, query.mode)
            .instrument(tracing::info_span!(
                "rescan_instance",
                %namespace,
                workload = %workload.name
            ))
            .await;
        if !result.contains(&workload.name) {
            result.scanned += 1;
        }
        result.upsert(outcome.clone());
        Ok(outcome)
    }

    async fn run_namespace(
        &self,
        namespace: String,
        matcher: &Matcher,
        mode: SearchMode,
    ) -> NamespaceResult {
        let span = tracing::info_span!("scan_namespace", %namespace);
        self.scan_namespace_inner(namespace, matcher, mode)
            .instrument(span)
            .await
    }

    async fn scan_namespace_inner(
        &self,
        namespace: String,
        matcher: &Matcher,
        mode: SearchMode,
    ) -> NamespaceResult {
        let instances = match self.inventory.list_instances(&namespace).await {
            Ok(instances) => instances,
            Err(err) => {
                tracing::warn!(error = %err, "namespace enumeration failed");
                return NamespaceResult::enumeration_failed(namespace, err.to_string());
            }
        };

        let mut result = NamespaceResult::new(namespace.as_str());
        result.scanned = instances.len();

        let outcomes: Vec<InstanceOutcome> = stream::iter(&instances)
            .map(|workload| self.scan_instance(&namespace, workload, matcher, mode))
            .buffer_unordered(self.config.instance_concurrency.max(1))
            .collect()
            .await;
        for outcome in outcomes {
            result.push(outcome);
        }
        result.sort();

        tracing::info!(
            scanned = result.scanned,
            matched = result.matched.len(),
            clean = result.clean.len(),
            errors = result.errors.len(),
            "namespace scanned"
        );
        result
    }

    async fn scan_instance(
        &self,
        namespace: &str,
        workload: &WorkloadRef,
        matcher: &Matcher,
        mode: SearchMode,
    ) -> InstanceOutcome {
        let fetched =
            fetch_with_retry(self.fetcher.as_ref(), namespace, workload, &self.config).await;
        let document = match fetched {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(workload = %workload.name, error = %err, "instance fetch failed");
                return InstanceOutcome::Failed(ErrorEntry::instance(workload, err.to_string()));
            }
        };

        let payload = match RawPayload::from_json(document) {
            Ok(payload) => payload,
            Err(err) => {
                let err = FetchError::from(err);
                tracing::warn!(
                    workload = %workload.name,
                    error = %err,
                    "instance payload rejected"
                );
                return InstanceOutcome::Failed(ErrorEntry::instance(workload, err.to_string()));
            }
        };

        let normalized = normalize(&payload, &NormalizeOptions::new(workload.name.as_str()));
        let matches = find_matches(&normalized.sources, matcher, mode);
        tracing::debug!(
            workload = %workload.name,
            kind = payload.kind(),
            sources = normalized.sources.len(),
            matches = matches.len(),
            warnings = normalized.warnings.len(),
            "instance scanned"
        );

        if matches.is_empty() {
            InstanceOutcome::Clean(CleanInstance::new(workload, normalized.warnings))
        } else {
            InstanceOutcome::Matched(
                InstanceResult::new(workload, matches).with_warnings(normalized.warnings),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        lists: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl WorkloadInventory for Counting {
        async fn list_instances(
            &self,
            namespace: &str,
        ) -> Result<Vec<WorkloadRef>, InventoryError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if namespace == "locked" {
                return Err(InventoryError::new(namespace, "forbidden"));
            }
            Ok(vec![
                WorkloadRef::new("orders", "deployment"),
                WorkloadRef::new("billing", "deploymentconfig"),
                WorkloadRef::new("audit", "deployment"),
            ])
        }
    }

    #[async_trait::async_trait]
    impl PayloadFetcher for Counting {
        async fn fetch(
            &self,
            _namespace: &str,
            workload: &WorkloadRef,
        ) -> Result<Value, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match workload.name.as_str() {
                "audit" => Err(FetchError::coded(404, "workload_not_found", "no such workload")),
                name => Ok(json!({
                    "activeProfiles": [],
                    "propertySources": [
                        {
                            "name": "commandLineArgs",
                            "properties": {"db.url": {"value": format!("jdbc:{name}")}}
                        },
                        {
                            "name": "application.yml",
                            "properties": {
                                "db.url": {"value": "jdbc:h2"},
                                "db.user": {"value": "sa"}
                            }
                        }
                    ]
                })),
            }
        }
    }

    fn scanner() -> (Scanner, Arc<Counting>) {
        let collab = Arc::new(Counting::default());
        (Scanner::new(collab.clone(), collab.clone()), collab)
    }

    #[tokio::test]
    async fn invalid_pattern_issues_no_work() {
        let (scanner, collab) = scanner();
        let query = ScanQuery::new("db.(url").with_namespaces(["team-a"]);
        assert!(matches!(scanner.scan(&query).await, Err(ScanError::InvalidPattern(_))));
        assert_eq!(collab.lists.load(Ordering::SeqCst), 0);
        assert_eq!(collab.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn results_are_sorted_and_failures_contained() {
        let (scanner, _) = scanner();
        let query = ScanQuery::new("db\\.url").with_namespaces(["team-b", "locked", "team-a"]);
        let report = scanner.scan(&query).await.unwrap();

        let names: Vec<&str> = report.results.iter().map(|r| r.namespace.as_str()).collect();
        assert_eq!(names, vec!["locked", "team-a", "team-b"]);

        let locked = report.namespace("locked").unwrap();
        assert!(locked.errors[0].is_namespace_failure());

        let team_a = report.namespace("team-a").unwrap();
        assert_eq!(team_a.scanned, 3);
        let instances: Vec<&str> = team_a
            .matched
            .iter()
            .map(|r| r.workload_name.as_str())
            .collect();
        assert_eq!(instances, vec!["billing", "orders"]);
        assert_eq!(team_a.matched[0].matches[0].value, "jdbc:billing");
        assert_eq!(team_a.matched[0].matches[0].source, "commandLineArgs");
        assert!(team_a.errors[0].message.contains("workload_not_found"));
    }

    #[tokio::test]
    async fn all_sources_mode_reports_overridden_definitions() {
        let (scanner, _) = scanner();
        let query = ScanQuery::new("^db\\.url$")
            .with_mode(SearchMode::AllSources)
            .with_namespaces(["team-a"]);
        let report = scanner.scan(&query).await.unwrap();
        let billing = report
            .namespace("team-a")
            .unwrap()
            .instance("billing")
            .unwrap();
        assert_eq!(billing.matches.len(), 2);
        assert!(!billing.matches[0].overridden);
        assert!(billing.matches[1].overridden);
    }

    #[tokio::test]
    async fn clean_instances_are_listed_apart_from_matches() {
        let (scanner, _) = scanner();
        let query = ScanQuery::new("no-such-key").with_namespaces(["team-a"]);
        let report = scanner.scan(&query).await.unwrap();
        let team_a = report.namespace("team-a").unwrap();
        assert!(team_a.matched.is_empty());
        assert_eq!(team_a.errors.len(), 1);
        let clean: Vec<&str> = team_a
            .clean
            .iter()
            .map(|c| c.workload_name.as_str())
            .collect();
        assert_eq!(clean, vec!["billing", "orders"]);
        assert!(team_a.clean.iter().all(|c| c.warnings.is_empty()));
        assert_eq!(team_a.scanned, 3);
    }
}
