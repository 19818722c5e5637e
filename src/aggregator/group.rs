//! Coordinated-Group Strategy
//!
//! One task per partition inside a [`TaskGroup`] sharing a single [`CancelToken`].
//! The first member to fail records its error and cancels the token; every sibling
//! then unwinds at its next suspension point (jitter sleep, fetch, channel send).
//!
//! All members stream into one records channel. A closer task awaits the whole group,
//! drops the last sender (closing the channel exactly once) and hands back the group's
//! terminal error. The collector drains the channel and then consults that error:
//! a failed run returns no records.

use super::types::RunError;
use crate::cancel::CancelToken;
use crate::jitter::jitter_delay;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};
use crate::source::RecordFetcher;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const CHANNEL_CAPACITY: usize = 1;

/// A set of tasks with first-error-wins semantics.
///
/// The first member returning a non-cancellation error becomes the group's terminal
/// error and cancels the shared token. Later errors are discarded.
pub struct TaskGroup {
    tasks: JoinSet<()>,
    cancel: CancelToken,
    first_error: Arc<Mutex<Option<RunError>>>,
}

impl TaskGroup {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, member: F)
    where
        F: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let first_error = self.first_error.clone();

        self.tasks.spawn(async move {
            if let Err(err) = member.await {
                record_failure(&first_error, &cancel, err);
            }
        });
    }

    /// Waits for every member to exit and returns the terminal error, if any.
    pub async fn wait(mut self) -> Result<(), RunError> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                record_failure(
                    &self.first_error,
                    &self.cancel,
                    RunError::TaskFailed {
                        reason: e.to_string(),
                    },
                );
            }
        }

        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record_failure(slot: &Mutex<Option<RunError>>, cancel: &CancelToken, err: RunError) {
    if err.is_cancellation() {
        return;
    }

    let mut first = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if first.is_none() {
        tracing::warn!("group: first failure, cancelling siblings: {}", err);
        *first = Some(err);
        cancel.cancel();
    } else {
        tracing::debug!("group: discarding later failure: {}", err);
    }
}

/// Sends one record, giving up as soon as `cancel` fires. Returns `false` when the
/// caller should stop streaming (cancelled or receiver gone).
pub(crate) async fn send_unless_cancelled(
    tx: &mpsc::Sender<Record>,
    record: Record,
    cancel: &CancelToken,
) -> bool {
    tokio::select! {
        sent = tx.send(record) => sent.is_ok(),
        _ = cancel.cancelled() => false,
    }
}

pub async fn run(
    fetcher: Arc<dyn RecordFetcher>,
    partitions: &[PartitionId],
    filter: &Filter,
    jitter_max: Duration,
) -> Result<Vec<Record>, RunError> {
    let cancel = CancelToken::new();
    let mut group = TaskGroup::new(cancel.clone());
    let (record_tx, mut record_rx) = mpsc::channel::<Record>(CHANNEL_CAPACITY);
    let filter = Arc::new(filter.clone());

    for partition in partitions.iter().cloned() {
        let fetcher = fetcher.clone();
        let filter = filter.clone();
        let cancel = cancel.clone();
        let record_tx = record_tx.clone();

        group.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(jitter_delay(jitter_max)) => {}
                _ = cancel.cancelled() => return Ok(()),
            }

            let records = fetcher
                .fetch(&partition, &filter, &cancel)
                .await
                .map_err(|source| RunError::fetch(partition.clone(), source))?;
            tracing::debug!("group: {} records from {}", records.len(), partition);

            for record in records {
                if !send_unless_cancelled(&record_tx, record, &cancel).await {
                    tracing::debug!("group: {} stopped streaming", partition);
                    return Ok(());
                }
            }
            Ok::<(), RunError>(())
        });
    }

    let closer = tokio::spawn(async move {
        let outcome = group.wait().await;
        drop(record_tx);
        outcome
    });

    let mut records = Vec::new();
    while let Some(record) = record_rx.recv().await {
        records.push(record);
    }

    let outcome = closer.await.map_err(|e| RunError::TaskFailed {
        reason: e.to_string(),
    })?;
    outcome.map(|()| records)
}
