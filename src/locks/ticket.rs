//! Ticket locks
//!
//! Two 32-bit counters, `next` (next ticket to hand out) and `serving`
//! (ticket currently allowed in), each on its own cache line. Counters
//! start at 0/0 and use the pre-increment convention: `acquire` takes
//! `my = next.fetch_add(1)` and waits for `serving == my`. Wrap-around is
//! fine as long as fewer than 2^31 workers queue, since the comparison is
//! plain unsigned equality.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

use super::{Lock, WorkerId};

/// Fair FIFO ticket lock.
pub struct TicketLock {
    next: CachePadded<AtomicU32>,
    serving: CachePadded<AtomicU32>,
}

impl TicketLock {
    pub fn new() -> Self {
        Self {
            next: CachePadded::new(AtomicU32::new(0)),
            serving: CachePadded::new(AtomicU32::new(0)),
        }
    }
}

impl Default for TicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TicketLock {
    fn acquire(&self, _wid: WorkerId) {
        let my = self.next.fetch_add(1, Ordering::Relaxed);
        while self.serving.load(Ordering::Acquire) != my {
            std::hint::spin_loop();
        }
    }

    fn release(&self, _wid: WorkerId) {
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticket"
    }
}

/// Ticket lock that refuses to queue.
///
/// Takes a ticket only when the lock looks free (`serving == next`), so a
/// held lock sees no writes to `next` from waiters. The cost is the FIFO
/// guarantee: a late arrival can win the CAS race against a worker that
/// has been observing for longer.
pub struct TicketLockPreLoad {
    next: CachePadded<AtomicU32>,
    serving: CachePadded<AtomicU32>,
}

impl TicketLockPreLoad {
    pub fn new() -> Self {
        Self {
            next: CachePadded::new(AtomicU32::new(0)),
            serving: CachePadded::new(AtomicU32::new(0)),
        }
    }
}

impl Default for TicketLockPreLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TicketLockPreLoad {
    fn acquire(&self, _wid: WorkerId) {
        loop {
            let s = self.serving.load(Ordering::Relaxed);
            let n = self.next.load(Ordering::Relaxed);
            if s == n {
                if self
                    .next
                    .compare_exchange_weak(
                        n,
                        n.wrapping_add(1),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    // Our ticket is n; usually serving == n already.
                    while self.serving.load(Ordering::Acquire) != n {
                        std::hint::spin_loop();
                    }
                    return;
                }
            } else {
                std::hint::spin_loop();
            }
        }
    }

    fn release(&self, _wid: WorkerId) {
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "ticket_preload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::Lock;

    #[test]
    fn test_uncontended_acquire_release() {
        let lock = TicketLock::new();
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
    }

    #[test]
    fn test_preload_uncontended_acquire_release() {
        let lock = TicketLockPreLoad::new();
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
    }

    #[test]
    fn test_ticket_wraparound_equality() {
        // Start both counters near u32::MAX; acquire must still pair.
        let lock = TicketLock::new();
        lock.next.store(u32::MAX, Ordering::Relaxed);
        lock.serving.store(u32::MAX, Ordering::Relaxed);
        lock.acquire(0);
        lock.release(0);
        assert_eq!(lock.next.load(Ordering::Relaxed), 0);
        assert_eq!(lock.serving.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_handoff_between_threads() {
        use std::sync::Arc;

        let lock = Arc::new(TicketLock::new());
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
