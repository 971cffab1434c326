//! OS mutex baseline

use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

use super::{Lock, WorkerId};

/// Blocking mutex baseline.
///
/// The one variant that parks instead of spinning; everything else in
/// this module is measured against it.
pub struct MutexLock {
    raw: RawMutex,
}

impl MutexLock {
    pub const fn new() -> Self {
        Self { raw: RawMutex::INIT }
    }
}

impl Default for MutexLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for MutexLock {
    fn acquire(&self, _wid: WorkerId) {
        self.raw.lock();
    }

    fn release(&self, _wid: WorkerId) {
        // SAFETY: the Lock capability pairs every release with a prior
        // acquire on the same worker.
        unsafe { self.raw.unlock() };
    }

    fn name(&self) -> &'static str {
        "mutex"
    }
}
