//! Ticket locks with contention back-off
//!
//! All three variants keep the plain ticket protocol (see `ticket.rs`)
//! and differ only in how a waiter spends its time in line. The distance
//! to the head of the queue (`my - serving`, wrapping) prices the wait:
//! a waiter two tickets out has no business re-reading `serving` every
//! cycle.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

use super::{Lock, WorkerId};
use crate::utils::relax::{cpu_relax, prefetch_write};

/// Relax cycles per ticket of distance.
const BASE_WAIT: u32 = 4;
/// Relax cycles when we are next in line.
const WAIT_NEXT: u32 = 2;
/// Beyond this distance the waiter also yields its time slice.
const YIELD_DISTANCE: u32 = 20;
/// Upper bound on the stale-observation ramp multiplier.
const RAMP_CAP: u32 = 64;
/// Hard cap for the adaptive schedule.
const ADAPTIVE_CAP: u32 = 512;
/// Relax cycles at the head of the adaptive schedule.
const ADAPTIVE_NEAR: u32 = 16;

/// Shared wait loop: proportional pause, ramping while the observed
/// distance is stale, optional OS yield when deep in the queue.
fn wait_for_turn(serving: &AtomicU32, my: u32) {
    let mut last_distance = 0u32;
    let mut ramp = 1u32;
    loop {
        let now = serving.load(Ordering::Acquire);
        let distance = my.wrapping_sub(now);
        if distance == 0 {
            return;
        }
        if distance != last_distance {
            // The queue moved; restart the ramp.
            last_distance = distance;
            ramp = 1;
        } else {
            ramp = ramp.saturating_mul(2).min(RAMP_CAP);
        }
        if distance > YIELD_DISTANCE {
            std::thread::yield_now();
        }
        let pause = if distance == 1 {
            WAIT_NEXT
        } else {
            distance.saturating_mul(BASE_WAIT)
        };
        cpu_relax(pause.saturating_mul(ramp));
    }
}

/// Ticket lock with proportional back-off.
pub struct TicketLockBackOff {
    next: CachePadded<AtomicU32>,
    serving: CachePadded<AtomicU32>,
}

impl TicketLockBackOff {
    pub fn new() -> Self {
        Self {
            next: CachePadded::new(AtomicU32::new(0)),
            serving: CachePadded::new(AtomicU32::new(0)),
        }
    }
}

impl Default for TicketLockBackOff {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TicketLockBackOff {
    fn acquire(&self, _wid: WorkerId) {
        let my = self.next.fetch_add(1, Ordering::Relaxed);
        wait_for_turn(&self.serving, my);
    }

    fn release(&self, _wid: WorkerId) {
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticket_backoff"
    }
}

/// Proportional back-off plus write-prefetch hints.
///
/// Hints the upcoming RMW targets (`next` on acquire, `serving` on
/// release) so the line arrives in exclusive state before the RMW asks
/// for it. Best-effort; may compile to nothing off x86.
pub struct TicketLockBackOffPrefetch {
    next: CachePadded<AtomicU32>,
    serving: CachePadded<AtomicU32>,
}

impl TicketLockBackOffPrefetch {
    pub fn new() -> Self {
        Self {
            next: CachePadded::new(AtomicU32::new(0)),
            serving: CachePadded::new(AtomicU32::new(0)),
        }
    }
}

impl Default for TicketLockBackOffPrefetch {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TicketLockBackOffPrefetch {
    fn acquire(&self, _wid: WorkerId) {
        prefetch_write::<AtomicU32>(&*self.next);
        let my = self.next.fetch_add(1, Ordering::Relaxed);
        wait_for_turn(&self.serving, my);
    }

    fn release(&self, _wid: WorkerId) {
        prefetch_write::<AtomicU32>(&*self.serving);
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticket_backoff_prefetch"
    }
}

/// Ticket lock with a capped piecewise pause schedule.
///
/// Near the head (`distance <= 1`) pause a small constant, mid-queue ramp
/// linearly with distance, far out saturate at [`ADAPTIVE_CAP`]. Never
/// yields to the OS, so the worst pause between two `serving` reads is
/// bounded and the acquisition tail stays flat.
pub struct TicketLockAdaptive {
    next: CachePadded<AtomicU32>,
    serving: CachePadded<AtomicU32>,
}

impl TicketLockAdaptive {
    pub fn new() -> Self {
        Self {
            next: CachePadded::new(AtomicU32::new(0)),
            serving: CachePadded::new(AtomicU32::new(0)),
        }
    }

    fn pause_for(distance: u32) -> u32 {
        if distance <= 1 {
            ADAPTIVE_NEAR
        } else {
            ADAPTIVE_NEAR.saturating_mul(distance).min(ADAPTIVE_CAP)
        }
    }
}

impl Default for TicketLockAdaptive {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TicketLockAdaptive {
    fn acquire(&self, _wid: WorkerId) {
        let my = self.next.fetch_add(1, Ordering::Relaxed);
        loop {
            let distance = my.wrapping_sub(self.serving.load(Ordering::Acquire));
            if distance == 0 {
                return;
            }
            cpu_relax(Self::pause_for(distance));
        }
    }

    fn release(&self, _wid: WorkerId) {
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticket_adaptive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::Lock;

    #[test]
    fn test_backoff_uncontended_acquire_release() {
        let lock = TicketLockBackOff::new();
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
    }

    #[test]
    fn test_prefetch_uncontended_acquire_release() {
        let lock = TicketLockBackOffPrefetch::new();
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
    }

    #[test]
    fn test_adaptive_uncontended_acquire_release() {
        let lock = TicketLockAdaptive::new();
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
    }

    #[test]
    fn test_adaptive_schedule_shape() {
        assert_eq!(TicketLockAdaptive::pause_for(0), ADAPTIVE_NEAR);
        assert_eq!(TicketLockAdaptive::pause_for(1), ADAPTIVE_NEAR);
        // Mid ramps linearly.
        assert_eq!(TicketLockAdaptive::pause_for(2), 2 * ADAPTIVE_NEAR);
        assert_eq!(TicketLockAdaptive::pause_for(10), 10 * ADAPTIVE_NEAR);
        // Far saturates at the cap.
        assert_eq!(TicketLockAdaptive::pause_for(64), ADAPTIVE_CAP);
        assert_eq!(TicketLockAdaptive::pause_for(u32::MAX), ADAPTIVE_CAP);
    }

    #[test]
    fn test_tunables_in_documented_ranges() {
        assert!((4..=512).contains(&BASE_WAIT));
        assert!((1..=128).contains(&WAIT_NEXT));
    }

    #[test]
    fn test_backoff_handoff_between_threads() {
        use std::sync::Arc;

        let lock = Arc::new(TicketLockBackOff::new());
        lock.acquire(0);

        let t = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                lock.acquire(1);
                lock.release(1);
            })
        };

        lock.release(0);
        t.join().unwrap();
    }
}
