//! One timed train + predict cycle.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use xgbench_core::{load, slice, Learner, XgbApi};

use crate::config::{Backend, BenchConfig};
use crate::errors::Result;

/// Outcome of one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub backend: Backend,
    pub train_rows: usize,
    pub test_rows: usize,
    pub features: usize,
    pub rounds: u32,
    /// Wall time of `train` plus `predict`, excluding dataset loading.
    pub elapsed: Duration,
    /// Test rows predicted as the positive class.
    pub positives: usize,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run time: {:?}", self.elapsed)
    }
}

/// Load the dataset through the cache, slice the configured windows, then
/// time training and prediction on `api`.
pub fn run_benchmark(config: &BenchConfig, api: Arc<dyn XgbApi>) -> Result<BenchReport> {
    config.validate()?;

    let full = load(&config.data_path, &config.layout)?;
    info!(
        "Loaded {} rows with {} features",
        full.num_rows(),
        full.num_features()
    );
    let data = slice(&full, config.train_rows, config.test_rows)?;
    drop(full);
    let test_rows = data.test_data.as_deref().unwrap_or(&[]);

    let mut learner = Learner::new(api, config.params.clone());
    let started = Instant::now();
    learner.train(&data.train_data, &data.labels)?;
    let predictions = learner.predict(test_rows)?;
    let elapsed = started.elapsed();
    learner.release()?;

    let positives = predictions.iter().filter(|label| **label == 1.0).count();
    debug!(positives, "prediction summary");

    let report = BenchReport {
        backend: config.backend,
        train_rows: data.num_rows(),
        test_rows: test_rows.len(),
        features: data.num_features(),
        rounds: config.params.num_boost_round(),
        elapsed,
        positives,
    };
    info!(
        backend = report.backend.as_str(),
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        rounds = report.rounds,
        "benchmark complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_prints_run_time() {
        let report = BenchReport {
            backend: Backend::Simulated,
            train_rows: 10,
            test_rows: 2,
            features: 3,
            rounds: 4,
            elapsed: Duration::from_millis(1500),
            positives: 1,
        };
        assert_eq!(report.to_string(), "Run time: 1.5s");
    }
}
