//! Testing utilities for cfgdrift workspace
//!
//! Collaborator doubles, payload builders and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use cfgdrift_resolve::WorkloadRef;
use cfgdrift_scan::{FetchError, InventoryError, PayloadFetcher, WorkloadInventory};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a `RUST_LOG`-driven subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Inventory with fixed instance lists and scripted enumeration failures
#[derive(Debug, Default)]
pub struct StaticInventory {
    namespaces: HashMap<String, Result<Vec<WorkloadRef>, String>>,
    calls: AtomicUsize,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace<I, S>(mut self, namespace: &str, instances: I) -> Self
    where
        I: IntoIterator<Item = (S, &'static str)>,
        S: Into<String>,
    {
        let refs = instances
            .into_iter()
            .map(|(name, kind)| WorkloadRef::new(name, kind))
            .collect();
        self.namespaces.insert(namespace.to_string(), Ok(refs));
        self
    }

    pub fn with_failure(mut self, namespace: &str, message: &str) -> Self {
        self.namespaces
            .insert(namespace.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkloadInventory for StaticInventory {
    async fn list_instances(
        &self,
        namespace: &str,
    ) -> Result<Vec<WorkloadRef>, InventoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.namespaces.get(namespace) {
            Some(Ok(instances)) => Ok(instances.clone()),
            Some(Err(message)) => Err(InventoryError::new(namespace, message.clone())),
            None => Err(InventoryError::new(namespace, "namespace not found")),
        }
    }
}

type Step = Result<Value, FetchError>;

/// Fetcher answering from per-instance scripts
///
/// Each call pops the next scripted step; the last step repeats once the
/// script runs dry. Unscripted instances answer 404 `workload_not_found`.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<(String, String), VecDeque<Step>>>,
    calls: Mutex<HashMap<(String, String), usize>>,
    total: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `payload`
    pub fn with_payload(self, namespace: &str, workload: &str, payload: Value) -> Self {
        self.with_script(namespace, workload, vec![Ok(payload)])
    }

    /// Answer with each step in turn
    pub fn with_script(self, namespace: &str, workload: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .insert((namespace.to_string(), workload.to_string()), steps.into());
        self
    }

    /// Replace an instance's script mid-test
    pub fn set_payload(&self, namespace: &str, workload: &str, payload: Value) {
        self.scripts.lock().insert(
            (namespace.to_string(), workload.to_string()),
            VecDeque::from(vec![Ok(payload)]),
        );
    }

    pub fn calls(&self, namespace: &str, workload: &str) -> usize {
        self.calls
            .lock()
            .get(&(namespace.to_string(), workload.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayloadFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        namespace: &str,
        workload: &WorkloadRef,
    ) -> Result<Value, FetchError> {
        let key = (namespace.to_string(), workload.name.clone());
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(key.clone()).or_default() += 1;

        let mut scripts = self.scripts.lock();
        let Some(script) = scripts.get_mut(&key) else {
            return Err(FetchError::coded(
                404,
                "workload_not_found",
                format!("no workload {}", workload.name),
            ));
        };
        if script.len() > 1 {
            script
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("empty script".into())))
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Transport("empty script".into())))
        }
    }
}

/// Actuator environment dump with `{value}` wrapped properties
pub fn actuator_payload(profiles: &[&str], sources: &[(&str, &[(&str, Value)])]) -> Value {
    let sources: Vec<Value> = sources
        .iter()
        .map(|(name, props)| {
            let properties: Map<String, Value> = props
                .iter()
                .map(|(k, v)| ((*k).to_string(), json!({ "value": v })))
                .collect();
            json!({ "name": name, "properties": properties })
        })
        .collect();
    json!({ "activeProfiles": profiles, "propertySources": sources })
}

/// Config server response
pub fn config_server_payload(
    name: &str,
    profiles: &[&str],
    documents: &[(&str, &[(&str, Value)])],
) -> Value {
    let sources: Vec<Value> = documents
        .iter()
        .map(|(doc, props)| {
            let source: Map<String, Value> = props
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect();
            json!({ "name": doc, "source": source })
        })
        .collect();
    json!({
        "name": name,
        "profiles": profiles,
        "label": null,
        "propertySources": sources
    })
}

const CONFIG_SERVER_URL: &str = "http://config-server:8888";

/// Collector report with classpath resources and an optional config server body
pub fn agent_bundle(files: &[(&str, &str)], config_server: Option<Value>) -> Value {
    let config_server = config_server.map_or_else(
        || json!({}),
        |body| json!({ "url": CONFIG_SERVER_URL, "status": 200, "content": body.to_string() }),
    );
    bundle_with_config_server(files, config_server)
}

/// Collector report whose config server call answered `status` with no body
pub fn agent_bundle_server_down(files: &[(&str, &str)], status: u16) -> Value {
    bundle_with_config_server(
        files,
        json!({ "url": CONFIG_SERVER_URL, "status": status, "content": "" }),
    )
}

fn bundle_with_config_server(files: &[(&str, &str)], config_server: Value) -> Value {
    let mut classpath = Map::new();
    for (name, content) in files {
        classpath.insert(
            (*name).to_string(),
            json!([{
                "name": name,
                "location": format!("classpath:/{name}"),
                "content": content
            }]),
        );
    }
    json!({
        "classpathResources": classpath,
        "files": { "matches": [] },
        "jarResources": { "matches": [] },
        "configServer": config_server
    })
}

/// Backend envelope around a payload
pub fn envelope(namespace: &str, workload: &str, kind: &str, payload: Value) -> Value {
    json!({
        "namespace": namespace,
        "workloadName": workload,
        "workloadKind": kind,
        "payload": payload
    })
}
