//! Region Sweep Library
//!
//! Queries many independent partitions (cloud regions) in parallel and merges their
//! records into one collection, with three interchangeable concurrency strategies
//! that share one correctness contract.
//!
//! ## Architecture Modules
//! - **`partition`**: The data model. Partition ids, records, and the query filter.
//! - **`source`**: The I/O boundary. Lister/fetcher traits, bounded retry, an HTTP
//!   client and a scripted in-memory source.
//! - **`aggregator`**: The three strategies (sequential, manual fan-out, coordinated
//!   group) and the `Aggregator` that lists partitions and dispatches a run.
//! - **`bench`**: Wall-clock and runtime-task measurement around a run.
//! - **`server`**: A demo partition service over HTTP, backed by the in-memory source.
//! - **`config`**: Explicit configuration from environment and flags.
//! - **`cancel`** / **`jitter`**: Shared cancellation token and randomized delays.

pub mod aggregator;
pub mod bench;
pub mod cancel;
pub mod config;
pub mod jitter;
pub mod partition;
pub mod server;
pub mod source;
