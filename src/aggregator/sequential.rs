//! Sequential Strategy
//!
//! The baseline: partitions are queried one at a time in listing order. Used for
//! correctness comparison and as the performance floor.

use super::types::RunError;
use crate::cancel::CancelToken;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};
use crate::source::RecordFetcher;

pub async fn run(
    fetcher: &dyn RecordFetcher,
    partitions: &[PartitionId],
    filter: &Filter,
) -> Result<Vec<Record>, RunError> {
    // Nothing ever cancels a sequential run.
    let cancel = CancelToken::new();
    let mut records = Vec::new();

    for partition in partitions {
        let batch = fetcher
            .fetch(partition, filter, &cancel)
            .await
            .map_err(|source| RunError::fetch(partition.clone(), source))?;

        tracing::debug!("sequential: {} records from {}", batch.len(), partition);
        records.extend(batch);
    }

    Ok(records)
}
