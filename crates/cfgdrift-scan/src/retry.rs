//! Fetch retry with linear backoff

use crate::collab::PayloadFetcher;
use crate::config::ScanConfig;
use crate::error::FetchError;
use cfgdrift_resolve::WorkloadRef;
use serde_json::Value;

/// Fetch a payload, retrying transient failures
///
/// Attempt `n` that fails transiently is followed by a wait of
/// `n * base_delay`. Non-retryable failures and the failure of the final
/// attempt are returned as-is.
///
/// # Errors
/// The last `FetchError` seen.
pub async fn fetch_with_retry(
    fetcher: &dyn PayloadFetcher,
    namespace: &str,
    workload: &WorkloadRef,
    config: &ScanConfig,
) -> Result<Value, FetchError> {
    let mut attempt = 1;
    loop {
        match fetcher.fetch(namespace, workload).await {
            Ok(payload) => return Ok(payload),
            Err(err) if err.is_retryable(config, attempt) => {
                let delay = config.backoff(attempt);
                tracing::warn!(
                    namespace,
                    workload = %workload.name,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
