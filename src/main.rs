//! lockbench - lock contention micro-benchmark
//!
//! Sweeps a grid of (lock algorithm, worker count) cells, repeats each
//! cell, and emits one experiment record per cell to stdout and
//! optionally to a CSV consumed by tools/plot_locks.py.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lockbench::bench::{Harness, RunResult, CHECK_STRIDE};
use lockbench::config::{BenchConfig, CliArgs};
use lockbench::locks::LockKind;
use lockbench::report::{append_csv, ExperimentRecord, Reporter};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn print_banner(config: &BenchConfig) {
    if config.quiet {
        return;
    }

    println!("lockbench v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!(
        "Locks: {:?}",
        config.locks.iter().map(|l| l.as_str()).collect::<Vec<_>>()
    );
    println!("Task: {}", config.task);
    println!("Threads: {:?}", config.threads);
    println!(
        "Duration: {}s, Repeats: {}, Check stride: {}",
        config.duration_secs, config.repeats, CHECK_STRIDE
    );
    if config.task == lockbench::WorkloadKind::CpuBurn {
        println!("cpu_burn: P={}, L={}", config.parallel_iters, config.locked_iters);
    }
    if config.latency {
        println!("Gap sampling: on (adds a clock read per iteration)");
    }
    println!("====================================\n");
}

fn make_progress(config: &BenchConfig) -> Option<ProgressBar> {
    if config.quiet {
        return None;
    }
    let pb = ProgressBar::new(config.total_runs());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} runs | {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    Some(pb)
}

/// Run one sweep cell: `repeats` windows on a fresh lock instance,
/// averaged into a single record.
fn run_cell(
    config: &BenchConfig,
    harness: &Harness,
    kind: LockKind,
    threads: usize,
    progress: Option<&ProgressBar>,
) -> Result<ExperimentRecord> {
    let lock = kind.build(threads);
    let workload = config.task.build(config.parallel_iters, config.locked_iters);

    let mut ops_sum = 0u64;
    let mut last: Option<RunResult> = None;
    for _ in 0..config.repeats {
        let result = harness.run_full(
            std::sync::Arc::clone(&lock),
            std::sync::Arc::clone(&workload),
            threads,
            config.duration_secs,
        )?;
        ops_sum += result.total_ops;
        last = Some(result);
        if let Some(pb) = progress {
            pb.inc(1);
            pb.set_message(format!("{} x{}", kind.as_str(), threads));
        }
    }

    let last = last.expect("repeats >= 1");
    let avg_ops = ops_sum / u64::from(config.repeats);
    let (gap_p50_ns, gap_p99_ns) = match &last.gap_histogram {
        Some(hist) => (
            Some(hist.value_at_percentile(50.0)),
            Some(hist.value_at_percentile(99.0)),
        ),
        None => (None, None),
    };

    Ok(ExperimentRecord {
        task: config.task.as_str(),
        lock: kind.as_str(),
        threads,
        duration_secs: config.duration_secs,
        repeats: config.repeats,
        p: config.parallel_iters,
        l: config.locked_iters,
        check_stride: CHECK_STRIDE,
        avg_ops,
        ops_s: avg_ops as f64 / config.duration_secs,
        min_worker_ops: last.min_worker_ops(),
        max_worker_ops: last.max_worker_ops(),
        gap_p50_ns,
        gap_p99_ns,
    })
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = BenchConfig::from_cli(&args)?;

    setup_logging(config.verbose, config.quiet);
    print_banner(&config);

    let harness = Harness::new().with_gap_sampling(config.latency);
    let progress = make_progress(&config);
    let mut reporter = Reporter::new(config.format);
    let mut records = Vec::with_capacity(config.cells());

    for &kind in &config.locks {
        for &threads in &config.threads {
            let record = run_cell(&config, &harness, kind, threads, progress.as_ref())?;
            if let Some(pb) = progress.as_ref() {
                pb.suspend(|| reporter.emit(&record));
            } else {
                reporter.emit(&record);
            }
            records.push(record);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if let Some(ref path) = config.csv_path {
        append_csv(path, &records)?;
        info!("Wrote {} records to {}", records.len(), path.display());
    }

    Ok(())
}
