//! Manual Fan-Out Strategy
//!
//! One task per partition, two shared channels (records, errors) and a supervisor
//! acting as the completion barrier:
//!
//! 1. Each task sleeps a random jitter, fetches its partition, then sends every record
//!    individually on the records channel, or its error on the errors channel.
//! 2. The supervisor awaits every task handle and only then drops its sender handles.
//!    The per-task clones are already gone by then, so both channels close exactly once,
//!    after the last producer finished. The supervisor never reports to the caller.
//! 3. The collector selects over both channels until both are closed and returns the
//!    first error it sees immediately.
//!
//! Cancellation is passive: the token handed to each task is never cancelled, so after
//! an early error the remaining tasks still run their fetch to completion in the
//! background. Their later sends fail against the dropped receivers and they exit.

use super::types::RunError;
use crate::cancel::CancelToken;
use crate::jitter::jitter_delay;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};
use crate::source::RecordFetcher;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Closest tokio equivalent of an unbuffered channel.
const CHANNEL_CAPACITY: usize = 1;

pub async fn run(
    fetcher: Arc<dyn RecordFetcher>,
    partitions: &[PartitionId],
    filter: &Filter,
    jitter_max: Duration,
) -> Result<Vec<Record>, RunError> {
    let (record_tx, mut record_rx) = mpsc::channel::<Record>(CHANNEL_CAPACITY);
    let (error_tx, mut error_rx) = mpsc::channel::<RunError>(CHANNEL_CAPACITY);
    let filter = Arc::new(filter.clone());
    let cancel = CancelToken::new();

    let mut handles = Vec::with_capacity(partitions.len());
    for partition in partitions.iter().cloned() {
        let fetcher = fetcher.clone();
        let filter = filter.clone();
        let cancel = cancel.clone();
        let record_tx = record_tx.clone();
        let error_tx = error_tx.clone();

        handles.push(tokio::spawn(async move {
            tokio::time::sleep(jitter_delay(jitter_max)).await;

            match fetcher.fetch(&partition, &filter, &cancel).await {
                Ok(records) => {
                    tracing::debug!("fan-out: {} records from {}", records.len(), partition);
                    for record in records {
                        if record_tx.send(record).await.is_err() {
                            tracing::debug!(
                                "fan-out: collector gone, dropping remaining records of {}",
                                partition
                            );
                            return;
                        }
                    }
                }
                Err(source) => {
                    tracing::debug!("fan-out: {} failed: {}", partition, source);
                    // Ignored when the collector already returned.
                    let _ = error_tx.send(RunError::fetch(partition, source)).await;
                }
            }
        }));
    }

    tokio::spawn(async move {
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("fan-out: partition task did not finish: {}", e);
                let _ = error_tx
                    .send(RunError::TaskFailed {
                        reason: e.to_string(),
                    })
                    .await;
            }
        }
        drop(record_tx);
        drop(error_tx);
    });

    let mut records = Vec::new();
    let mut records_open = true;
    let mut errors_open = true;

    while records_open || errors_open {
        tokio::select! {
            received = record_rx.recv(), if records_open => match received {
                Some(record) => records.push(record),
                None => records_open = false,
            },
            received = error_rx.recv(), if errors_open => match received {
                Some(err) => {
                    tracing::warn!("fan-out: aborting run: {}", err);
                    return Err(err);
                }
                None => errors_open = false,
            },
        }
    }

    Ok(records)
}
