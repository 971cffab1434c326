//! Utility modules

pub mod affinity;
pub mod clock;
pub mod error;
pub mod relax;

pub use affinity::pin_to_core;
pub use clock::{now_seconds, sleep_seconds};
pub use error::{BenchError, Result};
pub use relax::{cpu_relax, prefetch_write};
