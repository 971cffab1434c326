//! Measurement harness
//!
//! Coordinates one experiment: N pinned workers, a coordinated start, a
//! wall-clock-bounded window, and aggregation of the per-worker counts.
//!
//! Protocol: reset the workload, allocate padded result slots and the
//! shared timing record, spawn workers (core `i mod ncpu`), wait for all
//! ready check-ins, raise `start`, sleep the window on the monotonic
//! clock, raise `stop`, join, sum. Reported throughput covers only
//! iterations inside the `[start, stop]` window at the granularity of the
//! workers' check stride.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hdrhistogram::Histogram;
use tracing::debug;

use super::counters::{ResultSlots, RunControl};
use super::worker::{Worker, WorkerOutcome};
use crate::locks::Lock;
use crate::utils::affinity::num_cpus;
use crate::utils::clock::{now_seconds, sleep_seconds};
use crate::utils::error::{BenchError, Result};
use crate::workload::Workload;

/// Aggregated outcome of one experiment
pub struct RunResult {
    /// Sum of per-worker counts
    pub total_ops: u64,
    /// Individual worker counts, indexed by worker id
    pub per_worker_ops: Vec<u64>,
    /// Measured wall time between the start and stop signals
    pub elapsed_secs: f64,
    /// How many workers were successfully pinned
    pub pinned_workers: usize,
    /// Merged inter-acquisition gaps (gap-sampling mode only)
    pub gap_histogram: Option<Histogram<u64>>,
}

impl RunResult {
    /// Throughput against the nominal window length.
    pub fn ops_per_second(&self, duration_secs: f64) -> f64 {
        self.total_ops as f64 / duration_secs
    }

    /// Smallest per-worker count; zero signals starvation.
    pub fn min_worker_ops(&self) -> u64 {
        self.per_worker_ops.iter().copied().min().unwrap_or(0)
    }

    pub fn max_worker_ops(&self) -> u64 {
        self.per_worker_ops.iter().copied().max().unwrap_or(0)
    }
}

/// Measurement harness
#[derive(Default)]
pub struct Harness {
    sample_gaps: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self { sample_gaps: false }
    }

    /// Enable inter-acquisition gap sampling (costs a clock read per
    /// iteration; keep off for throughput comparisons).
    pub fn with_gap_sampling(mut self, on: bool) -> Self {
        self.sample_gaps = on;
        self
    }

    /// Run one experiment and return total ops.
    pub fn run(
        &self,
        lock: Arc<dyn Lock>,
        workload: Arc<dyn Workload>,
        threads: usize,
        duration_secs: f64,
    ) -> Result<u64> {
        self.run_full(lock, workload, threads, duration_secs)
            .map(|r| r.total_ops)
    }

    /// Run one experiment and return the full aggregation.
    pub fn run_full(
        &self,
        lock: Arc<dyn Lock>,
        workload: Arc<dyn Workload>,
        threads: usize,
        duration_secs: f64,
    ) -> Result<RunResult> {
        if threads == 0 {
            return Err(BenchError::Config("worker count must be at least 1".into()));
        }
        if !(duration_secs > 0.0) {
            return Err(BenchError::Config(format!(
                "duration must be positive, got {duration_secs}"
            )));
        }

        workload.reset();

        let control = Arc::new(RunControl::new(duration_secs));
        let slots = Arc::new(ResultSlots::new(threads));
        let ncpu = num_cpus();

        debug!(
            lock = lock.name(),
            task = workload.name(),
            threads,
            duration_secs,
            ncpu,
            "starting run"
        );

        let mut handles: Vec<JoinHandle<WorkerOutcome>> = Vec::with_capacity(threads);
        for worker_id in 0..threads {
            let worker = Worker::new(
                worker_id,
                worker_id % ncpu,
                Arc::clone(&lock),
                Arc::clone(&workload),
                Arc::clone(&control),
                Arc::clone(&slots),
                self.sample_gaps,
            );
            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        control.wait_all_ready(threads as u32);

        let window_open = now_seconds();
        control.signal_start();
        sleep_seconds(duration_secs);
        control.signal_stop();
        let window_close = now_seconds();

        let outcomes: Vec<WorkerOutcome> = handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked"))
            .collect();

        let pinned_workers = outcomes.iter().filter(|o| o.pinned).count();
        let gap_histogram = self.merge_gap_histograms(&outcomes);

        let result = RunResult {
            total_ops: slots.total(),
            per_worker_ops: slots.per_worker(),
            elapsed_secs: window_close - window_open,
            pinned_workers,
            gap_histogram,
        };

        debug!(
            total_ops = result.total_ops,
            elapsed_secs = result.elapsed_secs,
            pinned = pinned_workers,
            "run complete"
        );

        Ok(result)
    }

    fn merge_gap_histograms(&self, outcomes: &[WorkerOutcome]) -> Option<Histogram<u64>> {
        if !self.sample_gaps {
            return None;
        }
        let mut merged: Option<Histogram<u64>> = None;
        for outcome in outcomes {
            if let Some(ref hist) = outcome.gap_histogram {
                match merged {
                    Some(ref mut m) => {
                        m.add(hist).ok();
                    }
                    None => merged = Some(hist.clone()),
                }
            }
        }
        merged
    }
}
