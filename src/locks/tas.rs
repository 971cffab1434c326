//! Test-and-set spinlocks

use std::sync::atomic::{AtomicBool, Ordering};

use super::{Lock, WorkerId};

/// Baseline test-and-set spinlock.
///
/// Every acquire attempt is an RMW, so each spin forces the cache line
/// into exclusive state on the spinning core and evicts the other
/// waiters' copies. That is the behaviour the pre-load variant exists to
/// measure against.
pub struct TasSpinlock {
    flag: AtomicBool,
}

impl TasSpinlock {
    pub const fn new() -> Self {
        Self { flag: AtomicBool::new(false) }
    }
}

impl Default for TasSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TasSpinlock {
    fn acquire(&self, _wid: WorkerId) {
        while self.flag.swap(true, Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    fn release(&self, _wid: WorkerId) {
        self.flag.store(false, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "tas"
    }
}

/// Test-and-test-and-set spinlock.
///
/// Plain-loads the flag (relaxed) and only attempts the RMW once the flag
/// reads unlocked, so waiters spin on a shared-state line instead of
/// ping-ponging it in exclusive state.
pub struct TasSpinlockPreLoad {
    flag: AtomicBool,
}

impl TasSpinlockPreLoad {
    pub const fn new() -> Self {
        Self { flag: AtomicBool::new(false) }
    }
}

impl Default for TasSpinlockPreLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for TasSpinlockPreLoad {
    fn acquire(&self, _wid: WorkerId) {
        loop {
            if !self.flag.load(Ordering::Relaxed) && !self.flag.swap(true, Ordering::Acquire) {
                return;
            }
            std::hint::spin_loop();
        }
    }

    fn release(&self, _wid: WorkerId) {
        self.flag.store(false, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "tas_preload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::Lock;

    #[test]
    fn test_uncontended_acquire_release() {
        let lock = TasSpinlock::new();
        lock.acquire(0);
        lock.release(0);
        lock.acquire(0);
        lock.release(0);
    }

    #[test]
    fn test_preload_uncontended_acquire_release() {
        let lock = TasSpinlockPreLoad::new();
        lock.acquire(0);
        lock.release(0);
        lock.acquire(0);
        lock.release(0);
    }

    #[test]
    fn test_handoff_between_threads() {
        use std::sync::Arc;

        let lock = Arc::new(TasSpinlock::new());
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
