//! Scans driven through scripted collaborators

use async_trait::async_trait;
use cfgdrift_audit::{
    results_from_rows, rows_from_results, summarize, AnnotationField, AnnotationLedger,
    MatchIdentity, ReviewStatus,
};
use cfgdrift_resolve::{InstanceOutcome, ParsePayloadWarning, ScanQuery, SearchMode, WorkloadRef};
use cfgdrift_scan::{
    FetchError, InventoryError, PayloadFetcher, ScanConfig, ScanError, Scanner, WorkloadInventory,
};
use cfgdrift_test_utils::{
    actuator_payload, agent_bundle, agent_bundle_server_down, config_server_payload, envelope,
    init_tracing, ScriptedFetcher, StaticInventory,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn db_actuator(url: &str) -> Value {
    actuator_payload(
        &["prod"],
        &[
            ("systemEnvironment", &[("DB_URL", json!(url))]),
            (
                "applicationConfig: [classpath:/application.yml]",
                &[("db.url", json!("jdbc:h2:mem"))],
            ),
        ],
    )
}

fn scanner(
    inventory: StaticInventory,
    fetcher: ScriptedFetcher,
) -> (Scanner, Arc<StaticInventory>, Arc<ScriptedFetcher>) {
    let inventory = Arc::new(inventory);
    let fetcher = Arc::new(fetcher);
    let config = ScanConfig::default().with_base_delay(Duration::from_millis(10));
    (
        Scanner::new(inventory.clone(), fetcher.clone()).with_config(config),
        inventory,
        fetcher,
    )
}

#[tokio::test]
async fn one_failing_namespace_does_not_sink_the_scan() {
    init_tracing();
    let inventory = StaticInventory::new()
        .with_namespace("team-a", [("orders", "deployment")])
        .with_namespace("team-c", [("billing", "deploymentconfig")])
        .with_failure("team-b", "forbidden");
    let fetcher = ScriptedFetcher::new()
        .with_payload("team-a", "orders", db_actuator("jdbc:pg://a"))
        .with_payload("team-c", "billing", db_actuator("jdbc:pg://c"));
    let (scanner, inventory, _) = scanner(inventory, fetcher);

    let query = ScanQuery::new("(?i)db[._]url").with_namespaces(["team-c", "team-a", "team-b"]);
    let report = scanner.scan(&query).await.unwrap();

    assert_eq!(inventory.calls(), 3);
    assert_eq!(report.results.len(), 3);
    let team_b = report.namespace("team-b").unwrap();
    assert!(team_b.matched.is_empty());
    assert_eq!(team_b.errors.len(), 1);
    assert!(team_b.errors[0].is_namespace_failure());
    assert!(team_b.errors[0].message.contains("forbidden"));

    for ns in ["team-a", "team-c"] {
        let result = report.namespace(ns).unwrap();
        assert_eq!(result.matched.len(), 1);
        assert!(result.errors.is_empty());
    }
    let orders = report.namespace("team-a").unwrap().instance("orders").unwrap();
    let keys: Vec<&str> = orders.matches.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["DB_URL", "db.url"]);
}

#[tokio::test]
async fn invalid_pattern_touches_no_collaborator() {
    let inventory = StaticInventory::new().with_namespace("team-a", [("orders", "deployment")]);
    let fetcher = ScriptedFetcher::new().with_payload("team-a", "orders", db_actuator("x"));
    let (scanner, inventory, fetcher) = scanner(inventory, fetcher);

    let err = scanner
        .scan(&ScanQuery::new("[unclosed").with_namespaces(["team-a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidPattern(_)));
    assert!(err.to_string().contains("[unclosed"));
    assert_eq!(inventory.calls(), 0);
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_failures_are_retried() {
    let inventory = StaticInventory::new()
        .with_namespace("team-a", [("orders", "deployment"), ("ledger", "deployment")]);
    let fetcher = ScriptedFetcher::new()
        .with_script(
            "team-a",
            "orders",
            vec![
                Err(FetchError::coded(503, "no_running_pods", "scaling")),
                Err(FetchError::Transport("connection reset".into())),
                Ok(db_actuator("jdbc:pg://a")),
            ],
        )
        .with_script(
            "team-a",
            "ledger",
            vec![Err(FetchError::coded(502, "actuator_unreachable", "down"))],
        );
    let (scanner, _, fetcher) = scanner(inventory, fetcher);

    let report = scanner
        .scan(&ScanQuery::new("db").with_namespaces(["team-a"]))
        .await
        .unwrap();
    let team_a = report.namespace("team-a").unwrap();

    assert_eq!(fetcher.calls("team-a", "orders"), 3);
    assert!(team_a.instance("orders").is_some());

    assert_eq!(fetcher.calls("team-a", "ledger"), 3);
    let ledger = team_a.error("ledger").unwrap();
    assert!(ledger.message.contains("actuator_unreachable"));
    assert_eq!(team_a.scanned, 2);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let inventory = StaticInventory::new().with_namespace("team-a", [("ghost", "deployment")]);
    let (scanner, _, fetcher) = scanner(inventory, ScriptedFetcher::new());

    let report = scanner
        .scan(&ScanQuery::new("db").with_namespaces(["team-a"]))
        .await
        .unwrap();
    assert_eq!(fetcher.calls("team-a", "ghost"), 1);
    assert!(report.namespace("team-a").unwrap().error("ghost").is_some());
}

fn audit_config_server() -> Value {
    config_server_payload(
        "audit",
        &[],
        &[(
            "https://git.example/cfg/audit.yml",
            &[("db.url", json!("jdbc:cs-audit"))],
        )],
    )
}

#[tokio::test]
async fn payload_shapes_are_detected_per_instance() {
    let inventory = StaticInventory::new().with_namespace(
        "team-a",
        [
            ("orders", "deployment"),
            ("billing", "deployment"),
            ("audit", "deployment"),
            ("junk", "deployment"),
        ],
    );
    let cs_body = config_server_payload(
        "billing",
        &["default"],
        &[
            (
                "https://git.example/cfg/billing.yml",
                &[("db.url", json!("jdbc:cs-billing"))],
            ),
            (
                "https://git.example/cfg/application.yml",
                &[("db.url", json!("jdbc:cs-shared"))],
            ),
        ],
    );
    let orders = envelope("team-a", "orders", "deployment", db_actuator("jdbc:a"));
    let fetcher = ScriptedFetcher::new()
        .with_payload("team-a", "orders", orders)
        .with_payload("team-a", "billing", cs_body)
        .with_payload(
            "team-a",
            "audit",
            agent_bundle(
                &[
                    ("application.yml", "db:\n  url: jdbc:image\n"),
                    ("bootstrap.yml", "db:\n  url: jdbc:boot\n"),
                ],
                Some(audit_config_server()),
            ),
        )
        .with_payload("team-a", "junk", json!({"hello": "world"}));
    let (scanner, _, _) = scanner(inventory, fetcher);

    let report = scanner
        .scan(&ScanQuery::new(r"^db\.url$").with_namespaces(["team-a"]))
        .await
        .unwrap();
    let team_a = report.namespace("team-a").unwrap();

    let billing = team_a.instance("billing").unwrap();
    assert_eq!(billing.matches.len(), 1);
    assert_eq!(billing.matches[0].value, "jdbc:cs-billing");

    let audit = team_a.instance("audit").unwrap();
    assert_eq!(audit.matches[0].value, "jdbc:cs-audit");

    let orders = team_a.instance("orders").unwrap();
    assert_eq!(orders.matches[0].value, "jdbc:h2:mem");

    let junk = team_a.error("junk").unwrap();
    assert!(junk.message.contains("undecodable"));
}

#[tokio::test]
async fn all_sources_mode_lists_shadowed_definitions() {
    let inventory = StaticInventory::new().with_namespace("team-a", [("audit", "deployment")]);
    let fetcher = ScriptedFetcher::new().with_payload(
        "team-a",
        "audit",
        agent_bundle(
            &[("application.yml", "db:\n  url: jdbc:image\n")],
            Some(audit_config_server()),
        ),
    );
    let (scanner, _, _) = scanner(inventory, fetcher);

    let query = ScanQuery::new(r"^db\.url$")
        .with_mode(SearchMode::AllSources)
        .with_namespaces(["team-a"]);
    let report = scanner.scan(&query).await.unwrap();
    let audit = report
        .namespace("team-a")
        .unwrap()
        .instance("audit")
        .unwrap();

    let values: Vec<(&str, bool)> = audit
        .matches
        .iter()
        .map(|m| (m.value.as_str(), m.overridden))
        .collect();
    assert_eq!(values, vec![("jdbc:cs-audit", false), ("jdbc:image", true)]);
}

#[tokio::test]
async fn rescan_replaces_the_instance_in_place() {
    let inventory = StaticInventory::new().with_namespace(
        "team-a",
        [("alpha", "deployment"), ("orders", "deployment"), ("zeta", "deployment")],
    );
    let fetcher = ScriptedFetcher::new()
        .with_payload("team-a", "alpha", db_actuator("jdbc:alpha"))
        .with_script(
            "team-a",
            "orders",
            vec![Err(FetchError::coded(404, "workload_not_found", "gone"))],
        )
        .with_payload("team-a", "zeta", db_actuator("jdbc:zeta"));
    let (scanner, _, fetcher) = scanner(inventory, fetcher);

    let query = ScanQuery::new("DB_URL").with_namespaces(["team-a"]);
    let mut report = scanner.scan(&query).await.unwrap();
    assert!(report.namespace("team-a").unwrap().error("orders").is_some());

    fetcher.set_payload("team-a", "orders", db_actuator("jdbc:orders"));
    let orders = WorkloadRef::new("orders", "deployment");
    let team_a = report.namespace_mut("team-a").unwrap();
    let outcome = scanner.rescan_instance(team_a, &orders, &query).await.unwrap();
    assert!(matches!(outcome, InstanceOutcome::Matched(_)));

    let names: Vec<&str> = team_a
        .matched
        .iter()
        .map(|r| r.workload_name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "orders", "zeta"]);
    assert!(team_a.errors.is_empty());
    assert_eq!(team_a.scanned, 3);

    let empty = actuator_payload(&[], &[("systemEnvironment", &[])]);
    fetcher.set_payload("team-a", "orders", empty);
    let outcome = scanner.rescan_instance(team_a, &orders, &query).await.unwrap();
    assert!(matches!(outcome, InstanceOutcome::Clean(_)));
    assert!(team_a.instance("orders").is_none());
    assert!(team_a.clean_instance("orders").is_some());
    assert_eq!(team_a.matched.len(), 2);
    assert_eq!(team_a.scanned, 3);
}

#[tokio::test]
async fn rescanning_a_clean_instance_keeps_the_count() {
    let inventory = StaticInventory::new()
        .with_namespace("team-a", [("a", "deployment"), ("b", "deployment")]);
    let fetcher = ScriptedFetcher::new()
        .with_payload("team-a", "a", db_actuator("jdbc:a"))
        .with_payload("team-a", "b", actuator_payload(&[], &[("systemEnvironment", &[])]));
    let (scanner, _, fetcher) = scanner(inventory, fetcher);

    let query = ScanQuery::new("DB_URL").with_namespaces(["team-a"]);
    let mut report = scanner.scan(&query).await.unwrap();
    let team_a = report.namespace_mut("team-a").unwrap();
    assert_eq!(team_a.scanned, 2);

    let b = WorkloadRef::new("b", "deployment");
    for _ in 0..3 {
        let outcome = scanner.rescan_instance(team_a, &b, &query).await.unwrap();
        assert!(matches!(outcome, InstanceOutcome::Clean(_)));
    }
    assert_eq!(fetcher.calls("team-a", "b"), 4);
    assert_eq!(team_a.scanned, 2);
    assert_eq!(team_a.clean.len(), 1);
    assert_eq!(team_a.matched.len(), 1);

    let late = WorkloadRef::new("c", "deployment");
    fetcher.set_payload("team-a", "c", db_actuator("jdbc:c"));
    scanner.rescan_instance(team_a, &late, &query).await.unwrap();
    scanner.rescan_instance(team_a, &late, &query).await.unwrap();
    assert_eq!(team_a.scanned, 3);
}

#[tokio::test]
async fn warnings_of_unmatched_instances_are_kept() {
    let inventory = StaticInventory::new().with_namespace(
        "team-a",
        [("gateway", "deployment"), ("orders", "deployment")],
    );
    let fetcher = ScriptedFetcher::new()
        .with_payload(
            "team-a",
            "gateway",
            agent_bundle_server_down(&[("application.yml", "server:\n  port: 8080\n")], 503),
        )
        .with_payload(
            "team-a",
            "orders",
            agent_bundle_server_down(&[("application.yml", "db:\n  url: jdbc:orders\n")], 503),
        );
    let (scanner, _, _) = scanner(inventory, fetcher);

    let query = ScanQuery::new(r"^db\.url$").with_namespaces(["team-a"]);
    let report = scanner.scan(&query).await.unwrap();
    let team_a = report.namespace("team-a").unwrap();

    assert!(team_a.errors.is_empty());
    let gateway = team_a.clean_instance("gateway").unwrap();
    assert!(matches!(
        gateway.warnings.as_slice(),
        [ParsePayloadWarning::ConfigServerUnavailable { detail, .. }] if detail == "HTTP 503"
    ));
    assert_eq!(team_a.instance("orders").unwrap().warnings.len(), 1);
    assert_eq!(team_a.warnings().count(), 2);

    let json = serde_json::to_string(team_a).unwrap();
    assert!(json.contains("HTTP 503"));

    let rows = rows_from_results(&report.results, &AnnotationLedger::new());
    let warned: Vec<&str> = rows
        .iter()
        .filter(|r| r.is_warning())
        .map(|r| r.instance.as_str())
        .collect();
    assert_eq!(warned, vec!["orders", "gateway"]);
    assert_eq!(results_from_rows(&rows).unwrap(), report.results);
}

#[tokio::test]
async fn review_state_follows_the_match_across_rescans() {
    let inventory = StaticInventory::new()
        .with_namespace("team-a", [("orders", "deployment"), ("ghost", "deployment")]);
    let fetcher = ScriptedFetcher::new().with_payload("team-a", "orders", db_actuator("jdbc:v1"));
    let (scanner, _, fetcher) = scanner(inventory, fetcher);

    let query = ScanQuery::new("^DB_URL$").with_namespaces(["team-a"]);
    let mut report = scanner.scan(&query).await.unwrap();

    let mut ledger = AnnotationLedger::new();
    let summary = summarize(&report.results, &ledger);
    assert_eq!(summary[0].status, ReviewStatus::NotWorked);

    let team_a = report.namespace("team-a").unwrap();
    let entry = &team_a.instance("orders").unwrap().matches[0];
    ledger.set_flag(
        &MatchIdentity::for_match("team-a", "orders", entry),
        AnnotationField::Justified,
        true,
    );
    assert_eq!(summarize(&report.results, &ledger)[0].status, ReviewStatus::Skipped);

    ledger.set_flag(
        &MatchIdentity::for_instance("team-a", "ghost"),
        AnnotationField::Justified,
        true,
    );
    assert_eq!(summarize(&report.results, &ledger)[0].status, ReviewStatus::Justified);

    fetcher.set_payload("team-a", "orders", db_actuator("jdbc:v2"));
    let team_a = report.namespace_mut("team-a").unwrap();
    scanner
        .rescan_instance(team_a, &WorkloadRef::new("orders", "deployment"), &query)
        .await
        .unwrap();
    assert_eq!(team_a.instance("orders").unwrap().matches[0].value, "jdbc:v2");
    assert_eq!(summarize(&report.results, &ledger)[0].status, ReviewStatus::Justified);
}

/// Tracks how many calls are in flight at once
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    async fn hold(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct GaugedCluster {
    instances_per_namespace: usize,
    listing: Gauge,
    fetching: Gauge,
}

#[async_trait]
impl WorkloadInventory for GaugedCluster {
    async fn list_instances(
        &self,
        _namespace: &str,
    ) -> Result<Vec<WorkloadRef>, InventoryError> {
        self.listing.hold().await;
        Ok((0..self.instances_per_namespace)
            .map(|i| WorkloadRef::new(format!("svc-{i:02}"), "deployment"))
            .collect())
    }
}

#[async_trait]
impl PayloadFetcher for GaugedCluster {
    async fn fetch(&self, _namespace: &str, workload: &WorkloadRef) -> Result<Value, FetchError> {
        self.fetching.hold().await;
        Ok(db_actuator(&format!("jdbc:{}", workload.name)))
    }
}

fn gauged(instances_per_namespace: usize) -> (Scanner, Arc<GaugedCluster>) {
    let cluster = Arc::new(GaugedCluster {
        instances_per_namespace,
        ..GaugedCluster::default()
    });
    (Scanner::new(cluster.clone(), cluster.clone()), cluster)
}

#[tokio::test(start_paused = true)]
async fn at_most_ten_namespaces_are_scanned_at_once() {
    let (scanner, cluster) = gauged(0);
    let namespaces: Vec<String> = (0..30).map(|i| format!("team-{i:02}")).collect();

    let report = scanner
        .scan(&ScanQuery::new("DB_URL").with_namespaces(namespaces))
        .await
        .unwrap();
    assert_eq!(report.results.len(), 30);
    assert_eq!(cluster.listing.peak(), 10);

    let (scanner, cluster) = gauged(0);
    let scanner = scanner.with_config(ScanConfig::default().with_namespace_concurrency(3));
    let namespaces: Vec<String> = (0..12).map(|i| format!("team-{i:02}")).collect();
    scanner
        .scan(&ScanQuery::new("DB_URL").with_namespaces(namespaces))
        .await
        .unwrap();
    assert_eq!(cluster.listing.peak(), 3);
}

#[tokio::test(start_paused = true)]
async fn at_most_ten_instances_are_fetched_at_once_per_namespace() {
    let (scanner, cluster) = gauged(30);

    let report = scanner
        .scan(&ScanQuery::new("DB_URL").with_namespaces(["team-a"]))
        .await
        .unwrap();
    let team_a = report.namespace("team-a").unwrap();
    assert_eq!(team_a.matched.len(), 30);
    assert_eq!(team_a.scanned, 30);
    assert_eq!(cluster.fetching.peak(), 10);

    let (scanner, cluster) = gauged(12);
    let scanner = scanner.with_config(ScanConfig::default().with_instance_concurrency(4));
    scanner
        .scan(&ScanQuery::new("DB_URL").with_namespaces(["team-a"]))
        .await
        .unwrap();
    assert_eq!(cluster.fetching.peak(), 4);
}
