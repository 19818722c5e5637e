//! Multi-Partition Aggregation
//!
//! Queries every partition for records and merges the results into one collection.
//! Three interchangeable strategies share one contract:
//! `run(partitions, filter) -> Result<Vec<Record>, RunError>`.
//!
//! ## Contract
//! - With no failures, every strategy returns the same records (as a multiset).
//! - The first failure wins and the run returns no records at all.
//! - Cancellation echoes are never reported as the run's error.
//!
//! ## Submodules
//! - **`sequential`**: One partition at a time; the correctness baseline.
//! - **`fan_out`**: Task per partition, records/errors channels, completion barrier, passive cancellation.
//! - **`group`**: Task per partition in a cancellable group; first error cancels the siblings.
//! - **`aggregator`**: Lists partitions and dispatches to a strategy.
//! - **`types`**: `RunError`, `Strategy`, `AggregatorConfig`.

pub mod aggregator;
pub mod fan_out;
pub mod group;
pub mod sequential;
pub mod types;
