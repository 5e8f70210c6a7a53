//! Scan configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry and fan-out settings for a [`Scanner`](crate::Scanner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Fetch attempts per instance, first try included
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`
    pub base_delay_ms: u64,
    /// Namespaces scanned at once
    pub namespace_concurrency: usize,
    /// Instances fetched at once within one namespace
    pub instance_concurrency: usize,
    /// Status codes worth another attempt
    pub retryable_statuses: Vec<u16>,
}

impl ScanConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing fields take defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed TOML, `ConfigError::Invalid` when
    /// the values fail [`validate`](Self::validate).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall a scan
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.namespace_concurrency == 0 {
            return Err(ConfigError::Invalid("namespace_concurrency must be at least 1".into()));
        }
        if self.instance_concurrency == 0 {
            return Err(ConfigError::Invalid("instance_concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// With fetch attempts
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// With backoff unit
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With namespace fan-out
    #[inline]
    #[must_use]
    pub fn with_namespace_concurrency(mut self, limit: usize) -> Self {
        self.namespace_concurrency = limit;
        self
    }

    /// With instance fan-out
    #[inline]
    #[must_use]
    pub fn with_instance_concurrency(mut self, limit: usize) -> Self {
        self.instance_concurrency = limit;
        self
    }

    /// With retryable status codes
    #[inline]
    #[must_use]
    pub fn with_retryable_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retryable_statuses = statuses.into();
        self
    }

    /// Backoff unit
    #[inline]
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Wait before the attempt following `attempt`
    #[inline]
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay().saturating_mul(attempt)
    }

    /// Whether a status code is worth another attempt
    #[inline]
    #[must_use]
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            namespace_concurrency: 10,
            instance_concurrency: 10,
            retryable_statuses: vec![408, 425, 429, 500, 502, 503, 504],
        }
    }
}
