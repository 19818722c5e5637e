//! Partition Sources
//!
//! The I/O boundary of the aggregator. A source answers two questions: which partitions
//! exist (`PartitionLister`) and which records a partition holds (`RecordFetcher`).
//!
//! ## Submodules
//! - **`error`**: The `FetchError` taxonomy shared by every source.
//! - **`retry`**: Bounded retry with capped exponential backoff, as a decorator over any source.
//! - **`http`**: reqwest-backed client for a remote partition service.
//! - **`memory`**: dashmap-backed scripted source used by tests, stress runs and the demo service.
//! - **`protocol`**: Endpoints and DTOs of the partition service.

pub mod error;
pub mod http;
pub mod memory;
pub mod protocol;
pub mod retry;

#[cfg(test)]
mod tests;

use crate::cancel::CancelToken;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};
use async_trait::async_trait;
use error::FetchError;
use std::sync::Arc;

/// Discovers the partition set through a fixed home partition.
#[async_trait]
pub trait PartitionLister: Send + Sync {
    async fn list(&self, home: &PartitionId) -> Result<Vec<PartitionId>, FetchError>;
}

/// Queries a single partition.
///
/// Implementations must return promptly once `cancel` fires, typically with
/// `FetchError::Cancelled`. Records are returned in the partition's own order.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(
        &self,
        partition: &PartitionId,
        filter: &Filter,
        cancel: &CancelToken,
    ) -> Result<Vec<Record>, FetchError>;
}

#[async_trait]
impl<T: PartitionLister + ?Sized> PartitionLister for Arc<T> {
    async fn list(&self, home: &PartitionId) -> Result<Vec<PartitionId>, FetchError> {
        (**self).list(home).await
    }
}

#[async_trait]
impl<T: RecordFetcher + ?Sized> RecordFetcher for Arc<T> {
    async fn fetch(
        &self,
        partition: &PartitionId,
        filter: &Filter,
        cancel: &CancelToken,
    ) -> Result<Vec<Record>, FetchError> {
        (**self).fetch(partition, filter, cancel).await
    }
}
