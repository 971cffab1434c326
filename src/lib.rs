//! lockbench library
//!
//! Micro-benchmark harness for mutual-exclusion primitives under
//! contention: a family of user-space lock algorithms and a
//! coordinated-start, affinity-pinned measurement engine producing
//! comparable throughput numbers across algorithms and thread counts.

pub mod bench;
pub mod config;
pub mod locks;
pub mod report;
pub mod utils;
pub mod workload;

pub use bench::{Harness, RunResult, CHECK_STRIDE};
pub use config::{BenchConfig, CliArgs};
pub use locks::{Lock, LockGuard, LockKind, WorkerId};
pub use report::{ExperimentRecord, RecordFormat, Reporter};
pub use utils::error::{BenchError, Result};
pub use workload::{Workload, WorkloadKind};
