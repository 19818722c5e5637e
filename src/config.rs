//! Runtime Configuration
//!
//! Everything a run needs is collected into [`SweepConfig`] and passed explicitly:
//! read from the environment first, then overridden by command-line flags.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SWEEP_ENDPOINT` | `http://127.0.0.1:7000` |
//! | `SWEEP_HOME_PARTITION` | `ap-northeast-1` |
//! | `SWEEP_JITTER_MS` | `1000` |
//! | `SWEEP_REQUEST_TIMEOUT_MS` | `5000` |

use crate::aggregator::types::{AggregatorConfig, DEFAULT_HOME_PARTITION, DEFAULT_JITTER_MAX};
use crate::partition::types::PartitionId;
use crate::source::retry::RetryPolicy;

use anyhow::Context;
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "SWEEP_ENDPOINT";
pub const ENV_HOME_PARTITION: &str = "SWEEP_HOME_PARTITION";
pub const ENV_JITTER_MS: &str = "SWEEP_JITTER_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SWEEP_REQUEST_TIMEOUT_MS";

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Base URL of the partition service.
    pub endpoint: String,
    pub home_partition: PartitionId,
    pub jitter_max: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            home_partition: PartitionId::new(DEFAULT_HOME_PARTITION),
            jitter_max: DEFAULT_JITTER_MAX,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SweepConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(home) = lookup(ENV_HOME_PARTITION) {
            config.home_partition = PartitionId::new(home);
        }
        if let Some(raw) = lookup(ENV_JITTER_MS) {
            config.jitter_max = parse_millis(ENV_JITTER_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout = parse_millis(ENV_REQUEST_TIMEOUT_MS, &raw)?;
        }

        Ok(config)
    }

    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            home: self.home_partition.clone(),
            jitter_max: self.jitter_max,
        }
    }
}

pub fn parse_millis(name: &str, raw: &str) -> anyhow::Result<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a number of milliseconds, got {:?}", name, raw))?;
    Ok(Duration::from_millis(millis))
}
