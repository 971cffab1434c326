//! Monotonic wall-clock helpers
//!
//! One process-wide anchor; all timestamps are seconds since the first
//! call. `Instant` is monotonic and sub-microsecond on every platform we
//! run on, which is all the measurement window needs.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Seconds elapsed since the process-wide anchor.
#[inline]
pub fn now_seconds() -> f64 {
    anchor().elapsed().as_secs_f64()
}

/// Monotonic sleep used for the measurement window.
///
/// Sleeps the bulk in one syscall, then burns the residue against the
/// monotonic clock so the window length does not inherit the scheduler's
/// wakeup slop.
pub fn sleep_seconds(secs: f64) {
    let deadline = Instant::now() + Duration::from_secs_f64(secs);
    let coarse = secs - 2e-3;
    if coarse > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(coarse));
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_seconds_monotonic() {
        let a = now_seconds();
        let b = now_seconds();
        assert!(b >= a);
    }

    #[test]
    fn test_sleep_seconds_window() {
        let t0 = Instant::now();
        sleep_seconds(0.05);
        let elapsed = t0.elapsed().as_secs_f64();
        assert!(elapsed >= 0.05);
        assert!(elapsed < 0.2, "sleep overshot: {elapsed}s");
    }
}
