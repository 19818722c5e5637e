//! Scripted In-Memory Source
//!
//! A `PartitionLister` + `RecordFetcher` backed by a `DashMap` of partitions. Each
//! partition follows a [`PartitionScript`]: return records, fail with a fixed error,
//! or fail transiently a number of times before succeeding. An optional per-partition
//! delay simulates a slow network call and honors cancellation.
//!
//! The source counts attempts, completed fetches and cancelled fetches so callers can
//! observe how much work a strategy left running.

use super::error::FetchError;
use super::{PartitionLister, RecordFetcher};
use crate::cancel::CancelToken;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum PartitionScript {
    Records(Vec<Record>),
    Fail(FetchError),
    /// Fails with `FetchError::Transient` for the first `failures` attempts
    /// (counted over the lifetime of the source), then returns `records`.
    Flaky { failures: u32, records: Vec<Record> },
}

#[derive(Debug, Clone)]
struct PartitionEntry {
    script: PartitionScript,
    delay: Duration,
}

pub struct InMemorySource {
    order: Vec<PartitionId>,
    partitions: DashMap<PartitionId, PartitionEntry>,
    attempts: DashMap<PartitionId, u32>,
    list_failure: Option<FetchError>,
    list_calls: AtomicUsize,
    completed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            partitions: DashMap::new(),
            attempts: DashMap::new(),
            list_failure: None,
            list_calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    /// Adds (or replaces) a partition. Listing order follows first insertion.
    pub fn with_partition(mut self, id: impl Into<PartitionId>, script: PartitionScript) -> Self {
        let id = id.into();
        if !self.partitions.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.partitions.insert(
            id,
            PartitionEntry {
                script,
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn with_records(self, id: impl Into<PartitionId>, records: Vec<Record>) -> Self {
        self.with_partition(id, PartitionScript::Records(records))
    }

    pub fn with_failure(self, id: impl Into<PartitionId>, error: FetchError) -> Self {
        self.with_partition(id, PartitionScript::Fail(error))
    }

    /// Delays every fetch of `id`. No-op for unknown partitions.
    pub fn with_delay(self, id: impl Into<PartitionId>, delay: Duration) -> Self {
        let id = id.into();
        if let Some(mut entry) = self.partitions.get_mut(&id) {
            entry.delay = delay;
        }
        self
    }

    pub fn with_list_failure(mut self, error: FetchError) -> Self {
        self.list_failure = Some(error);
        self
    }

    pub fn partition_ids(&self) -> &[PartitionId] {
        &self.order
    }

    pub fn contains(&self, id: &PartitionId) -> bool {
        self.partitions.contains_key(id)
    }

    /// Fetch attempts made against `id` so far.
    pub fn attempts(&self, id: &PartitionId) -> u32 {
        self.attempts.get(id).map(|a| *a).unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.iter().map(|entry| *entry.value()).sum()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Fetches that ran to the end of their script, successful or not.
    pub fn completed_fetches(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Fetches that observed cancellation during their delay.
    pub fn cancelled_fetches(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut source = Self::new();
        for partition in fixture.partitions {
            let script = if let Some(message) = partition.fail {
                PartitionScript::Fail(FetchError::Rejected(message))
            } else if partition.transient_failures > 0 {
                PartitionScript::Flaky {
                    failures: partition.transient_failures,
                    records: partition.records,
                }
            } else {
                PartitionScript::Records(partition.records)
            };
            let id = PartitionId::new(partition.id);
            source = source
                .with_partition(id.clone(), script)
                .with_delay(id, Duration::from_millis(partition.delay_ms));
        }
        source
    }

    pub fn load_fixture_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture file {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse fixture file {}", path.display()))?;
        tracing::info!(
            "Loaded {} partitions from {}",
            fixture.partitions.len(),
            path.display()
        );
        Ok(Self::from_fixture(fixture))
    }

    fn next_attempt(&self, id: &PartitionId) -> u32 {
        let mut attempts = self.attempts.entry(id.clone()).or_insert(0);
        *attempts += 1;
        *attempts
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PartitionLister for InMemorySource {
    async fn list(&self, home: &PartitionId) -> Result<Vec<PartitionId>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.list_failure {
            tracing::warn!("Listing through {} fails by script: {}", home, error);
            return Err(error.clone());
        }
        tracing::debug!("Listing {} partitions through {}", self.order.len(), home);
        Ok(self.order.clone())
    }
}

#[async_trait]
impl RecordFetcher for InMemorySource {
    async fn fetch(
        &self,
        partition: &PartitionId,
        filter: &Filter,
        cancel: &CancelToken,
    ) -> Result<Vec<Record>, FetchError> {
        // Clone out of the map: no shard guard may live across the delay.
        let entry = self
            .partitions
            .get(partition)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FetchError::NotFound(partition.to_string()))?;
        let attempt = self.next_attempt(partition);

        if !entry.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(entry.delay) => {}
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!("Fetch for {} cancelled mid-flight", partition);
                    return Err(FetchError::Cancelled);
                }
            }
        }

        let outcome = match entry.script {
            PartitionScript::Records(records) => Ok(records),
            PartitionScript::Fail(error) => Err(error),
            PartitionScript::Flaky { failures, records } => {
                if attempt <= failures {
                    Err(FetchError::Transient(format!(
                        "throttled ({}/{})",
                        attempt, failures
                    )))
                } else {
                    Ok(records)
                }
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);

        outcome.map(|records| records.into_iter().filter(|r| filter.matches(r)).collect())
    }
}

/// On-disk description of a scripted source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub partitions: Vec<FixturePartition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePartition {
    pub id: String,
    #[serde(default)]
    pub records: Vec<Record>,
    /// Fixed, non-retryable failure message.
    #[serde(default)]
    pub fail: Option<String>,
    #[serde(default)]
    pub transient_failures: u32,
    #[serde(default)]
    pub delay_ms: u64,
}
