//! Benchmark worker
//!
//! Each worker owns its loop state exclusively; the only shared writes in
//! the measurement loop go through the lock under test. The stop flag is
//! polled every [`CHECK_STRIDE`] iterations so the flag read never costs
//! the common path anything; the overshoot past the window is bounded by
//! `(CHECK_STRIDE - 1) * per_iteration_time`.

use std::sync::Arc;
use std::time::Instant;

use hdrhistogram::Histogram;

use super::counters::{ResultSlots, RunControl};
use crate::locks::{Lock, WorkerId};
use crate::utils::affinity::pin_to_core;
use crate::workload::Workload;

/// Stop-flag poll stride. Power of two; the loop masks with
/// `CHECK_STRIDE - 1`. Emitted in the experiment record as provenance
/// since it bounds the window overshoot.
pub const CHECK_STRIDE: u64 = 64;

/// Gap histogram range: 1ns to 60s, 3 significant digits.
const GAP_HIST_MAX_NS: u64 = 60_000_000_000;

/// Result from a worker thread
pub struct WorkerOutcome {
    /// Worker ID
    pub worker_id: WorkerId,
    /// Iterations completed inside the window
    pub ops: u64,
    /// Whether the affinity pin took effect
    pub pinned: bool,
    /// Inter-acquisition gaps in nanoseconds (gap-sampling mode only)
    pub gap_histogram: Option<Histogram<u64>>,
}

/// Benchmark worker (runs in a dedicated OS thread)
pub struct Worker {
    id: WorkerId,
    core: usize,
    lock: Arc<dyn Lock>,
    workload: Arc<dyn Workload>,
    control: Arc<RunControl>,
    slots: Arc<ResultSlots>,
    sample_gaps: bool,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        core: usize,
        lock: Arc<dyn Lock>,
        workload: Arc<dyn Workload>,
        control: Arc<RunControl>,
        slots: Arc<ResultSlots>,
        sample_gaps: bool,
    ) -> Self {
        Self { id, core, lock, workload, control, slots, sample_gaps }
    }

    /// Pin, check in, wait for the start barrier, run the measurement
    /// loop, publish the final count.
    pub fn run(self) -> WorkerOutcome {
        let pinned = pin_to_core(self.core);

        self.control.worker_ready();
        self.control.wait_for_start();

        let (ops, gap_histogram) = if self.sample_gaps {
            self.measure_with_gaps()
        } else {
            (self.measure(), None)
        };

        self.slots.record(self.id, ops);

        WorkerOutcome { worker_id: self.id, ops, pinned, gap_histogram }
    }

    /// Throughput loop: no clock reads, no OS calls.
    fn measure(&self) -> u64 {
        let mut local_count = 0u64;
        loop {
            if local_count & (CHECK_STRIDE - 1) == 0 && self.control.is_stopped() {
                break;
            }
            self.workload.run_parallel();
            self.lock.acquire(self.id);
            self.workload.run_locked();
            self.lock.release(self.id);
            local_count += 1;
        }
        local_count
    }

    /// Same loop, timestamping each acquisition to record the gap since
    /// this worker's previous one. Costs a clock read per iteration, so
    /// it is a separate mode rather than a flag inside the hot loop.
    fn measure_with_gaps(&self) -> (u64, Option<Histogram<u64>>) {
        let mut histogram = Histogram::new_with_bounds(1, GAP_HIST_MAX_NS, 3)
            .expect("Failed to create histogram");
        let mut local_count = 0u64;
        let mut last_acquired: Option<Instant> = None;

        loop {
            if local_count & (CHECK_STRIDE - 1) == 0 && self.control.is_stopped() {
                break;
            }
            self.workload.run_parallel();
            self.lock.acquire(self.id);
            let now = Instant::now();
            if let Some(prev) = last_acquired {
                let gap_ns = now.duration_since(prev).as_nanos() as u64;
                histogram.record(gap_ns.max(1)).ok();
            }
            last_acquired = Some(now);
            self.workload.run_locked();
            self.lock.release(self.id);
            local_count += 1;
        }

        (local_count, Some(histogram))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::LockKind;
    use crate::workload::WorkloadKind;

    fn spawn_single_worker(sample_gaps: bool) -> WorkerOutcome {
        let lock = LockKind::Tas.build(1);
        let workload = WorkloadKind::NoOp.build(0, 0);
        let control = Arc::new(RunControl::new(0.05));
        let slots = Arc::new(ResultSlots::new(1));

        let worker = Worker::new(
            0,
            0,
            lock,
            workload,
            Arc::clone(&control),
            Arc::clone(&slots),
            sample_gaps,
        );

        let handle = std::thread::spawn(move || worker.run());
        control.wait_all_ready(1);
        control.signal_start();
        std::thread::sleep(std::time::Duration::from_millis(50));
        control.signal_stop();
        let outcome = handle.join().unwrap();

        assert_eq!(slots.get(0), outcome.ops);
        outcome
    }

    #[test]
    fn test_worker_counts_iterations() {
        let outcome = spawn_single_worker(false);
        assert!(outcome.ops > 0);
        assert!(outcome.gap_histogram.is_none());
    }

    #[test]
    fn test_worker_records_gaps() {
        let outcome = spawn_single_worker(true);
        assert!(outcome.ops > 0);
        let hist = outcome.gap_histogram.expect("gap sampling enabled");
        // One gap per acquisition after the first.
        assert_eq!(hist.len(), outcome.ops - 1);
    }

    #[test]
    fn test_check_stride_is_power_of_two() {
        assert!(CHECK_STRIDE.is_power_of_two());
    }
}
