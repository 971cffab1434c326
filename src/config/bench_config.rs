//! Resolved benchmark configuration

use std::path::PathBuf;

use super::cli::{CliArgs, RecordFormat};
use crate::locks::LockKind;
use crate::utils::error::{BenchError, Result};
use crate::workload::WorkloadKind;

/// Complete benchmark configuration, resolved from CLI arguments
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Lock kinds to sweep, in report order
    pub locks: Vec<LockKind>,
    /// Workload kind
    pub task: WorkloadKind,
    /// Worker counts to sweep, ascending
    pub threads: Vec<usize>,
    /// Measurement window per run, seconds
    pub duration_secs: f64,
    /// Repeats per cell
    pub repeats: u32,
    /// cpu_burn parallel-section iterations
    pub parallel_iters: u32,
    /// cpu_burn locked-section iterations
    pub locked_iters: u32,
    /// Inter-acquisition gap sampling
    pub latency: bool,

    /// CSV output file
    pub csv_path: Option<PathBuf>,
    /// Stdout record format
    pub format: RecordFormat,
    pub quiet: bool,
    pub verbose: bool,
}

impl BenchConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        args.validate().map_err(BenchError::Config)?;

        let task = WorkloadKind::parse(&args.task)
            .ok_or_else(|| BenchError::UnknownTask(args.task.clone()))?;

        Ok(Self {
            locks: args.effective_locks(),
            task,
            threads: args.effective_threads(),
            duration_secs: args.duration,
            repeats: args.repeats,
            parallel_iters: args.parallel_iters,
            locked_iters: args.locked_iters,
            latency: args.latency,
            csv_path: args.csv.clone(),
            format: args.format,
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// Number of (lock, threads) cells in the sweep
    pub fn cells(&self) -> usize {
        self.locks.len() * self.threads.len()
    }

    /// Total harness runs including repeats
    pub fn total_runs(&self) -> u64 {
        self.cells() as u64 * self.repeats as u64
    }
}
