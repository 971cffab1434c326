//! Experiment records and output formatting
//!
//! One record per (task, lock, threads, duration, repeats, p, l) sweep
//! cell. The record shape, and in particular the CSV columns `task`,
//! `lock`, `threads`, `ops_s`, is the stable contract consumed by
//! `tools/plot_locks.py`; everything else here is presentation.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

pub use crate::config::cli::RecordFormat;

/// One emitted experiment result
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentRecord {
    pub task: &'static str,
    pub lock: &'static str,
    pub threads: usize,
    pub duration_secs: f64,
    pub repeats: u32,
    /// cpu_burn parallel-section iterations
    pub p: u32,
    /// cpu_burn locked-section iterations
    pub l: u32,
    /// Stop-flag poll stride; bounds the window overshoot (provenance)
    pub check_stride: u64,
    /// Ops averaged over repeats
    pub avg_ops: u64,
    pub ops_s: f64,
    /// Smallest per-worker count in the last repeat; 0 flags starvation
    pub min_worker_ops: u64,
    pub max_worker_ops: u64,
    /// Median inter-acquisition gap (gap-sampling mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_p50_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_p99_ns: Option<u64>,
}

impl ExperimentRecord {
    /// CSV header matching [`to_csv_row`](Self::to_csv_row)
    pub fn csv_header() -> &'static str {
        "task,lock,threads,duration_s,repeats,p,l,check_stride,avg_ops,ops_s,\
         min_worker_ops,max_worker_ops,gap_p50_ns,gap_p99_ns"
    }

    /// Format as a CSV row
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{:.3},{},{},{},{},{},{:.1},{},{},{},{}",
            self.task,
            self.lock,
            self.threads,
            self.duration_secs,
            self.repeats,
            self.p,
            self.l,
            self.check_stride,
            self.avg_ops,
            self.ops_s,
            self.min_worker_ops,
            self.max_worker_ops,
            self.gap_p50_ns.map(|v| v.to_string()).unwrap_or_default(),
            self.gap_p99_ns.map(|v| v.to_string()).unwrap_or_default(),
        )
    }
}

/// Emits records to stdout in the configured format
pub struct Reporter {
    format: RecordFormat,
    csv_header_emitted: bool,
}

impl Reporter {
    pub fn new(format: RecordFormat) -> Self {
        Self { format, csv_header_emitted: false }
    }

    /// Print one record to stdout
    pub fn emit(&mut self, record: &ExperimentRecord) {
        match self.format {
            RecordFormat::Console => Self::emit_console(record),
            RecordFormat::Json => {
                let json = serde_json::to_string(record).expect("record serializes");
                println!("{json}");
            }
            RecordFormat::Csv => {
                if !self.csv_header_emitted {
                    println!("{}", ExperimentRecord::csv_header());
                    self.csv_header_emitted = true;
                }
                println!("{}", record.to_csv_row());
            }
        }
    }

    fn emit_console(record: &ExperimentRecord) {
        println!("\n=== {} / {} / {} threads ===", record.task, record.lock, record.threads);
        println!(
            "Ops: {} (avg of {} x {:.2}s windows)",
            record.avg_ops, record.repeats, record.duration_secs
        );
        println!("Throughput: {:.0} ops/s", record.ops_s);
        println!(
            "Worker spread (last repeat): min {} / max {}",
            record.min_worker_ops, record.max_worker_ops
        );
        if let (Some(p50), Some(p99)) = (record.gap_p50_ns, record.gap_p99_ns) {
            println!("Acquisition gap: p50 {p50} ns, p99 {p99} ns");
        }
    }
}

/// Append records to a CSV file, writing the header when the file is new.
pub fn append_csv(path: &Path, records: &[ExperimentRecord]) -> io::Result<()> {
    let write_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if write_header {
        writeln!(file, "{}", ExperimentRecord::csv_header())?;
    }
    for record in records {
        writeln!(file, "{}", record.to_csv_row())?;
    }
    Ok(())
}
