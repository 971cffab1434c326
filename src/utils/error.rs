//! Error types for lockbench

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown lock kind: {0}")]
    UnknownLock(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
