//! Measurement engine
//!
//! - RunControl: the shared timing record (ready / start / stop)
//! - ResultSlots: cache-padded per-worker op counters
//! - Worker: one pinned busy loop between start and stop
//! - Harness: builds workers, opens the timing window, aggregates

pub mod counters;
pub mod harness;
pub mod worker;

pub use counters::{ResultSlots, RunControl};
pub use harness::{Harness, RunResult};
pub use worker::{Worker, WorkerOutcome, CHECK_STRIDE};
