use crate::partition::types::PartitionId;
use crate::source::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Home partition used when nothing else is configured.
pub const DEFAULT_HOME_PARTITION: &str = "ap-northeast-1";
/// Upper bound of the per-task jitter delay.
pub const DEFAULT_JITTER_MAX: Duration = Duration::from_millis(1000);

/// Which phase of a run produced the terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Listing,
    Fetch,
}

/// The first failure of a run. Later failures are discarded.
#[derive(Debug, Error)]
pub enum RunError {
    /// Partition discovery failed; nothing was fanned out.
    #[error("listing partitions through {home} failed: {source}")]
    Listing {
        home: PartitionId,
        #[source]
        source: FetchError,
    },

    #[error("fetching records for partition {partition} failed: {source}")]
    Fetch {
        partition: PartitionId,
        #[source]
        source: FetchError,
    },

    /// A partition task panicked or was aborted by the runtime.
    #[error("partition task failed: {reason}")]
    TaskFailed { reason: String },
}

impl RunError {
    pub fn fetch(partition: PartitionId, source: FetchError) -> Self {
        RunError::Fetch { partition, source }
    }

    pub fn phase(&self) -> RunPhase {
        match self {
            RunError::Listing { .. } => RunPhase::Listing,
            RunError::Fetch { .. } | RunError::TaskFailed { .. } => RunPhase::Fetch,
        }
    }

    /// Partition the failure belongs to, if any.
    pub fn partition(&self) -> Option<&PartitionId> {
        match self {
            RunError::Fetch { partition, .. } => Some(partition),
            RunError::Listing { .. } | RunError::TaskFailed { .. } => None,
        }
    }

    /// True for the echo of a cancellation; never reported as a run's error.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RunError::Fetch { source, .. } if source.is_cancelled())
    }
}

/// The interchangeable aggregation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One partition at a time.
    Sequential,
    /// Task per partition, records and errors channels, completion barrier, no cancellation.
    FanOut,
    /// Task per partition in a cancellable group, first error wins.
    Group,
}

impl Strategy {
    /// Order in which `all` runs them.
    pub const ALL: [Strategy; 3] = [Strategy::FanOut, Strategy::Group, Strategy::Sequential];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::FanOut => "fan-out",
            Strategy::Group => "group",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" | "sync" => Ok(Strategy::Sequential),
            "fan-out" | "fanout" | "manual" => Ok(Strategy::FanOut),
            "group" | "coordinated" => Ok(Strategy::Group),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Explicit aggregator configuration. There is no process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Partition through which the partition set is discovered.
    pub home: PartitionId,
    /// Jitter before each concurrent fetch is uniform in `[0, jitter_max]`.
    pub jitter_max: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            home: PartitionId::new(DEFAULT_HOME_PARTITION),
            jitter_max: DEFAULT_JITTER_MAX,
        }
    }
}
