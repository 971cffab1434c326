//! Mutual-exclusion stress tests
//!
//! A plain (non-atomic) counter incremented under each lock kind. Any
//! exclusion violation loses increments, so the final value being exact
//! is the whole assertion. The counter write is intentionally unsynchronized
//! apart from the lock under test.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::thread;

use lockbench::locks::LockKind;

/// Shared counter with no synchronization of its own.
struct RacyCounter(UnsafeCell<u64>);

// SAFETY: all access happens inside the lock under test; that exclusion
// is exactly what these tests verify.
unsafe impl Sync for RacyCounter {}

fn hammer(kind: LockKind, workers: usize, total_increments: u64) {
    let lock = kind.build(workers);
    let counter = Arc::new(RacyCounter(UnsafeCell::new(0)));
    let per_worker = total_increments / workers as u64;

    let handles: Vec<_> = (0..workers)
        .map(|wid| {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..per_worker {
                    lock.acquire(wid);
                    // SAFETY: we hold the lock.
                    unsafe { *counter.0.get() += 1 };
                    lock.release(wid);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let observed = unsafe { *counter.0.get() };
    assert_eq!(
        observed,
        per_worker * workers as u64,
        "{} lost increments with {} workers",
        kind.as_str(),
        workers
    );
}

fn hammer_all_counts(kind: LockKind) {
    hammer(kind, 1, 1_000_000);
    hammer(kind, 2, 1_000_000);
    hammer(kind, 8, 1_000_000);
    // Heavily oversubscribed; a smaller increment count keeps spin-heavy
    // kinds from dominating the suite's runtime without weakening the
    // property.
    hammer(kind, 32, 200_000);
}

#[test]
fn mutual_exclusion_mutex() {
    hammer_all_counts(LockKind::Mutex);
}

#[test]
fn mutual_exclusion_tas() {
    hammer_all_counts(LockKind::Tas);
}

#[test]
fn mutual_exclusion_tas_preload() {
    hammer_all_counts(LockKind::TasPreLoad);
}

#[test]
fn mutual_exclusion_ticket() {
    hammer_all_counts(LockKind::Ticket);
}

#[test]
fn mutual_exclusion_ticket_preload() {
    hammer_all_counts(LockKind::TicketPreLoad);
}

#[test]
fn mutual_exclusion_ticket_backoff() {
    hammer_all_counts(LockKind::TicketBackOff);
}

#[test]
fn mutual_exclusion_ticket_backoff_prefetch() {
    hammer_all_counts(LockKind::TicketBackOffPrefetch);
}

#[test]
fn mutual_exclusion_ticket_adaptive() {
    hammer_all_counts(LockKind::TicketAdaptive);
}

#[test]
fn mutual_exclusion_mcs() {
    hammer_all_counts(LockKind::Mcs);
}

#[test]
fn mutual_exclusion_mcs_preload() {
    hammer_all_counts(LockKind::McsPreLoad);
}
