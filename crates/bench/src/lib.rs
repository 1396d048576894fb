//! Benchmark runner for the XGBoost bindings
//!
//! Loads the cached dataset, slices the benchmark windows and times one
//! train + predict cycle through [`xgbench_core::Learner`].

pub mod config;
pub mod errors;
pub mod runner;

pub use config::{Backend, BenchConfig, Overrides, DEFAULT_CONFIG_FILE};
pub use errors::{BenchError, Result};
pub use runner::{run_benchmark, BenchReport};
