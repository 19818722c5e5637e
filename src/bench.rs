//! Benchmark Harness
//!
//! Wraps one aggregation run and records wall-clock time plus a snapshot of the
//! runtime taken at completion. `alive_tasks` is the number of tokio tasks still alive
//! when the run returned; background work left behind by a strategy shows up here.

use crate::aggregator::aggregator::Aggregator;
use crate::aggregator::types::{RunError, Strategy};
use crate::partition::filter::FilterPredicate;
use crate::partition::types::Record;

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub strategy: Strategy,
    pub elapsed: Duration,
    /// Logical CPUs of the host.
    pub cpus: usize,
    /// Worker threads of the current runtime.
    pub workers: usize,
    /// Runtime tasks alive at completion, including the harness's own.
    pub alive_tasks: usize,
    /// `None` when the run failed.
    pub record_count: Option<usize>,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Strategy: {}", self.strategy)?;
        writeln!(f, "CpuCoreNumber: {}", self.cpus)?;
        writeln!(f, "RuntimeWorkers: {}", self.workers)?;
        writeln!(f, "AliveTasks: {}", self.alive_tasks)?;
        match self.record_count {
            Some(count) => writeln!(f, "Records: {}", count)?,
            None => writeln!(f, "Records: (run failed)")?,
        }
        write!(f, "ElapsedTime: {:?}", self.elapsed)
    }
}

/// Runs `strategy` once through `aggregator` and reports on it.
pub async fn measure(
    aggregator: &Aggregator,
    strategy: Strategy,
    extra: Vec<FilterPredicate>,
) -> (BenchReport, Result<Vec<Record>, RunError>) {
    let started = Instant::now();
    let outcome = aggregator.run(strategy, extra).await;
    let elapsed = started.elapsed();

    let metrics = tokio::runtime::Handle::current().metrics();
    let report = BenchReport {
        strategy,
        elapsed,
        cpus: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        workers: metrics.num_workers(),
        alive_tasks: metrics.num_alive_tasks(),
        record_count: outcome.as_ref().ok().map(Vec::len),
    };

    tracing::info!(
        "{} finished in {:?} ({} tasks alive)",
        strategy,
        report.elapsed,
        report.alive_tasks
    );
    (report, outcome)
}
