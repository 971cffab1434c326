//! Shared run state
//!
//! These are the ONLY synchronization points between worker threads
//! during a run. The timing record is written by the harness main and
//! read by workers; `ready` is a contended RMW but only during bring-up.
//! Result slots are written once per worker, after the stop flag.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Timing record shared by the harness main and all workers.
///
/// Lifecycle: workers bump `ready` and spin on `start`; once every worker
/// has checked in, the main raises `start` (release), sleeps the window,
/// and raises `stop` (release). `duration_secs` is published before any
/// worker is spawned.
pub struct RunControl {
    ready: AtomicU32,
    start: AtomicBool,
    stop: AtomicBool,
    duration_secs: f64,
}

impl RunControl {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            ready: AtomicU32::new(0),
            start: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            duration_secs,
        }
    }

    /// Broadcast measurement-window length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Worker check-in before the start barrier.
    #[inline]
    pub fn worker_ready(&self) {
        self.ready.fetch_add(1, Ordering::Relaxed);
    }

    /// Worker side of the start barrier.
    #[inline]
    pub fn wait_for_start(&self) {
        while !self.start.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    /// Main side of the start barrier: block until `n` workers checked in.
    pub fn wait_all_ready(&self, n: u32) {
        while self.ready.load(Ordering::Acquire) < n {
            std::thread::yield_now();
        }
    }

    /// Open the measurement window.
    pub fn signal_start(&self) {
        self.start.store(true, Ordering::Release);
    }

    /// Close the measurement window.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Polled by workers on the check stride.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Per-worker op-count slots, one exclusive cache line each.
///
/// Padding keeps the final write-backs (and the harness's aggregation
/// reads) from sharing lines across workers.
pub struct ResultSlots {
    slots: Box<[CachePadded<AtomicU64>]>,
}

impl ResultSlots {
    /// Allocate `n` zeroed slots.
    pub fn new(n: usize) -> Self {
        let slots = (0..n).map(|_| CachePadded::new(AtomicU64::new(0))).collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record a worker's final local count.
    pub fn record(&self, wid: usize, ops: u64) {
        self.slots[wid].store(ops, Ordering::Release);
    }

    pub fn get(&self, wid: usize) -> u64 {
        self.slots[wid].load(Ordering::Acquire)
    }

    /// Sum across all workers.
    pub fn total(&self) -> u64 {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).sum()
    }

    pub fn per_worker(&self) -> Vec<u64> {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ready_counts_all_workers() {
        let control = Arc::new(RunControl::new(1.0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&control);
                thread::spawn(move || c.worker_ready())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        control.wait_all_ready(4);
    }

    #[test]
    fn test_start_releases_waiters() {
        let control = Arc::new(RunControl::new(1.0));

        let waiter = {
            let c = Arc::clone(&control);
            thread::spawn(move || {
                c.worker_ready();
                c.wait_for_start();
            })
        };

        control.wait_all_ready(1);
        control.signal_start();
        waiter.join().unwrap();
    }

    #[test]
    fn test_stop_flag() {
        let control = RunControl::new(2.0);
        assert!(!control.is_stopped());
        control.signal_stop();
        assert!(control.is_stopped());
        assert_eq!(control.duration_secs(), 2.0);
    }

    #[test]
    fn test_slots_record_and_total() {
        let slots = ResultSlots::new(3);
        slots.record(0, 10);
        slots.record(1, 20);
        slots.record(2, 30);
        assert_eq!(slots.total(), 60);
        assert_eq!(slots.get(1), 20);
        assert_eq!(slots.per_worker(), vec![10, 20, 30]);
    }

    #[test]
    fn test_slots_are_cache_line_padded() {
        let slots = ResultSlots::new(2);
        let a = &*slots.slots[0] as *const AtomicU64 as usize;
        let b = &*slots.slots[1] as *const AtomicU64 as usize;
        assert!(b - a >= 64);
    }
}
