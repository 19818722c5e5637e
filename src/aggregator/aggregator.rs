//! Aggregation Entry Point
//!
//! Owns the lister, the fetcher and the configuration. A run lists the partitions
//! exactly once through the home partition, builds the filter and hands both to the
//! selected strategy.

use super::types::*;
use super::{fan_out, group, sequential};
use crate::partition::filter::{Filter, FilterPredicate};
use crate::partition::types::{PartitionId, Record};
use crate::source::{PartitionLister, RecordFetcher};

use std::sync::Arc;
use uuid::Uuid;

pub struct Aggregator {
    lister: Arc<dyn PartitionLister>,
    fetcher: Arc<dyn RecordFetcher>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        lister: Arc<dyn PartitionLister>,
        fetcher: Arc<dyn RecordFetcher>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            lister,
            fetcher,
            config,
        }
    }

    /// Discovers the partition set. Failure here is fatal to the run.
    pub async fn list_partitions(&self) -> Result<Vec<PartitionId>, RunError> {
        self.lister
            .list(&self.config.home)
            .await
            .map_err(|source| RunError::Listing {
                home: self.config.home.clone(),
                source,
            })
    }

    /// Lists partitions, then aggregates them with `strategy`. `extra` predicates are
    /// appended after the lifecycle-state predicate.
    pub async fn run(
        &self,
        strategy: Strategy,
        extra: Vec<FilterPredicate>,
    ) -> Result<Vec<Record>, RunError> {
        let run_id = Uuid::new_v4();
        tracing::info!("Run {} ({}) starting", run_id, strategy);

        let partitions = match self.list_partitions().await {
            Ok(partitions) => partitions,
            Err(e) => {
                tracing::error!("Run {} failed before fan-out: {}", run_id, e);
                return Err(e);
            }
        };
        tracing::info!(
            "Run {} discovered {} partitions through {}",
            run_id,
            partitions.len(),
            self.config.home
        );

        let filter = Filter::new(extra);
        match self.run_on(strategy, &partitions, &filter).await {
            Ok(records) => {
                tracing::info!("Run {} collected {} records", run_id, records.len());
                Ok(records)
            }
            Err(e) => {
                tracing::error!("Run {} failed: {}", run_id, e);
                Err(e)
            }
        }
    }

    /// Aggregates an already known partition set.
    pub async fn run_on(
        &self,
        strategy: Strategy,
        partitions: &[PartitionId],
        filter: &Filter,
    ) -> Result<Vec<Record>, RunError> {
        match strategy {
            Strategy::Sequential => sequential::run(&*self.fetcher, partitions, filter).await,
            Strategy::FanOut => {
                fan_out::run(
                    self.fetcher.clone(),
                    partitions,
                    filter,
                    self.config.jitter_max,
                )
                .await
            }
            Strategy::Group => {
                group::run(
                    self.fetcher.clone(),
                    partitions,
                    filter,
                    self.config.jitter_max,
                )
                .await
            }
        }
    }
}
