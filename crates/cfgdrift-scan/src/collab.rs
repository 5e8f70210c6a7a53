//! Collaborator contracts
//!
//! The orchestrator never talks to a cluster or an instance itself. It is
//! handed an inventory that enumerates instances and a fetcher that returns
//! each instance's raw payload document.

use crate::error::{FetchError, InventoryError};
use cfgdrift_resolve::WorkloadRef;
use serde_json::Value;

/// Enumerates the instances of a namespace
#[async_trait::async_trait]
pub trait WorkloadInventory: Send + Sync {
    /// Instances of a namespace, in any order
    async fn list_instances(&self, namespace: &str) -> Result<Vec<WorkloadRef>, InventoryError>;
}

/// Fetches one instance's raw configuration payload
///
/// Any supported payload shape may be returned as-is; the scanner detects its shape.
#[async_trait::async_trait]
pub trait PayloadFetcher: Send + Sync {
    /// Raw payload document of an instance
    async fn fetch(&self, namespace: &str, workload: &WorkloadRef) -> Result<Value, FetchError>;
}
