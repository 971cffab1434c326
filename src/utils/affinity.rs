//! Best-effort CPU pinning
//!
//! Affinity keeps worker-to-core placement stable across runs so that
//! throughput numbers are comparable. A failed pin is logged once and the
//! run continues; results are still meaningful within one machine.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

static WARNED: AtomicBool = AtomicBool::new(false);

fn warn_once(detail: &str) {
    if !WARNED.swap(true, Ordering::Relaxed) {
        warn!("CPU affinity unavailable ({detail}); continuing unpinned");
    }
}

/// Pin the calling thread to `core`. Returns whether the pin took effect.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> bool {
    // SAFETY: cpu_set_t is POD; CPU_ZERO/CPU_SET only touch the set we own.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core % libc::CPU_SETSIZE as usize, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc != 0 {
            warn_once(&format!("sched_setaffinity failed for core {core}"));
            return false;
        }
    }
    true
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(_core: usize) -> bool {
    warn_once("unsupported platform");
    false
}

/// Number of CPUs available to this process.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_cpus_positive() {
        assert!(num_cpus() >= 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_current_thread_returns() {
        // Best-effort contract: either outcome is legal (core 0 may be
        // outside this process's cpuset), the call just must not panic.
        let _ = pin_to_core(0);
    }
}
