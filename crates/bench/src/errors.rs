//! Error types for the benchmark runner

use std::path::PathBuf;
use thiserror::Error;
use xgbench_core::XgbError;

/// Errors raised while configuring or running a benchmark
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid or inconsistent configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Binding, learner or dataset failure
    #[error(transparent)]
    Core(#[from] XgbError),
}

pub type Result<T> = std::result::Result<T, BenchError>;
