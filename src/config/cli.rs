//! Command-line argument parsing
//!
//! Arguments are grouped by category. Validation that needs parsed kinds
//! (lock/task names, thread lists) lives in `validate()` so `main` can
//! reject bad input with one diagnostic before any thread is spawned.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::locks::LockKind;
use crate::workload::{WorkloadKind, DEFAULT_LOCKED_ITERS, DEFAULT_PARALLEL_ITERS};

/// Stdout format for experiment records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    Console,
    Json,
    Csv,
}

/// Micro-benchmark harness for mutual-exclusion primitives under contention
#[derive(Parser, Debug, Clone)]
#[command(name = "lockbench")]
#[command(version, about, long_about = "Measures throughput of competing lock algorithms \
as worker count scales.\n\n\
Runs a sweep over every (lock, threads) pair, repeats each cell, and emits one \
record per cell. Use --csv to also append rows for tools/plot_locks.py.")]
pub struct CliArgs {
    // ===== Experiment Selection =====
    /// Lock kinds to benchmark, comma-separated, or "all"
    #[arg(short = 'l', long = "locks", default_value = "all", value_delimiter = ',')]
    pub locks: Vec<String>,

    /// Workload: no_op or cpu_burn
    #[arg(short = 'r', long = "task", default_value = "no_op")]
    pub task: String,

    /// Worker counts to sweep, comma-separated
    #[arg(short = 't', long = "threads", default_value = "1,2,4,8", value_delimiter = ',')]
    pub threads: Vec<usize>,

    // ===== Measurement Parameters =====
    /// Measurement window per run, in seconds
    #[arg(short = 'd', long = "duration", default_value_t = 1.0)]
    pub duration: f64,

    /// Repeats per (lock, threads) cell; reported ops are the average
    #[arg(short = 'n', long = "repeats", default_value_t = 5)]
    pub repeats: u32,

    /// cpu_burn iterations in the parallel section
    #[arg(short = 'P', long = "parallel-iters", default_value_t = DEFAULT_PARALLEL_ITERS)]
    pub parallel_iters: u32,

    /// cpu_burn iterations in the critical section
    #[arg(short = 'L', long = "locked-iters", default_value_t = DEFAULT_LOCKED_ITERS)]
    pub locked_iters: u32,

    /// Record inter-acquisition gaps (adds a clock read per iteration)
    #[arg(long = "latency")]
    pub latency: bool,

    // ===== Output =====
    /// Append records to this CSV file
    #[arg(long = "csv")]
    pub csv: Option<PathBuf>,

    /// Stdout record format
    #[arg(long = "format", value_enum, default_value_t = RecordFormat::Console)]
    pub format: RecordFormat,

    /// Only errors on stderr, records on stdout; no progress bar
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Debug-level logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Validate argument combinations and names
    pub fn validate(&self) -> Result<(), String> {
        if !(self.duration > 0.0) {
            return Err(format!("--duration must be positive, got {}", self.duration));
        }
        if self.repeats == 0 {
            return Err("--repeats must be at least 1".to_string());
        }
        if self.threads.is_empty() {
            return Err("--threads needs at least one worker count".to_string());
        }
        if self.threads.iter().any(|&t| t == 0) {
            return Err("--threads entries must be at least 1".to_string());
        }
        if WorkloadKind::parse(&self.task).is_none() {
            return Err(format!("unknown task: {}", self.task));
        }
        for name in &self.locks {
            if name != "all" && LockKind::parse(name).is_none() {
                return Err(format!("unknown lock kind: {name}"));
            }
        }
        Ok(())
    }

    /// Lock kinds to run, expanded and in stable order
    pub fn effective_locks(&self) -> Vec<LockKind> {
        if self.locks.iter().any(|l| l == "all") {
            return LockKind::ALL.to_vec();
        }
        let mut kinds = Vec::new();
        for name in &self.locks {
            if let Some(kind) = LockKind::parse(name) {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        kinds
    }

    /// Thread counts to sweep, deduplicated, ascending
    pub fn effective_threads(&self) -> Vec<usize> {
        let mut counts = self.threads.clone();
        counts.sort_unstable();
        counts.dedup();
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = CliArgs::parse_from(["lockbench"]);
        assert_eq!(args.task, "no_op");
        assert_eq!(args.duration, 1.0);
        assert_eq!(args.repeats, 5);
        assert_eq!(args.parallel_iters, 2048);
        assert_eq!(args.locked_iters, 32);
        assert!(args.validate().is_ok());
        assert_eq!(args.effective_locks().len(), LockKind::ALL.len());
        assert_eq!(args.effective_threads(), vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_lock_list_parsing() {
        let args = CliArgs::parse_from(["lockbench", "-l", "tas,mcs"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.effective_locks(), vec![LockKind::Tas, LockKind::Mcs]);
    }

    #[test]
    fn test_duplicate_locks_deduped() {
        let args = CliArgs::parse_from(["lockbench", "-l", "tas,tas,ticket"]);
        assert_eq!(args.effective_locks(), vec![LockKind::Tas, LockKind::Ticket]);
    }

    #[test]
    fn test_thread_list_sorted_deduped() {
        let args = CliArgs::parse_from(["lockbench", "-t", "8,1,4,1"]);
        assert_eq!(args.effective_threads(), vec![1, 4, 8]);
    }

    #[test]
    fn test_rejects_unknown_lock() {
        let args = CliArgs::parse_from(["lockbench", "-l", "clh"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_task() {
        let args = CliArgs::parse_from(["lockbench", "-r", "disk_burn"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_duration_and_threads() {
        let args = CliArgs::parse_from(["lockbench", "-d", "0"]);
        assert!(args.validate().is_err());

        let args = CliArgs::parse_from(["lockbench", "-t", "0,2"]);
        assert!(args.validate().is_err());
    }
}
