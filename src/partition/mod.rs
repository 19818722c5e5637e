//! Partition Data Model
//!
//! Shared vocabulary for every aggregation strategy: what a partition is, what a
//! record looks like, and how a query filter is assembled.
//!
//! ## Core Concepts
//! - **Partition**: An independently queryable shard of the search space (a region).
//! - **Record**: A flat, immutable value returned by a partition query.
//! - **Filter**: An ordered list of `(name, values)` predicates sent identically to every
//!   partition. It always starts with the lifecycle-state restriction.

pub mod filter;
pub mod types;
