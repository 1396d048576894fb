use std::fs;

use tempfile::TempDir;
use xgbench::{run_benchmark, Backend, BenchConfig, BenchError};
use xgbench_core::{BoosterParams, DatasetLayout, SimulatedApi, XgbError};

const ROWS: usize = 40;

fn write_dataset(dir: &TempDir) {
    let body: String = (0..ROWS)
        .map(|i| {
            let label = (i % 2) as f32;
            let signal = label * 4.0 + (i % 5) as f32 * 0.1;
            format!("{label},{signal},{},{}\n", i as f32, 1.0)
        })
        .collect();
    fs::write(dir.path().join("small.txt"), body).unwrap();
}

fn config(dir: &TempDir) -> BenchConfig {
    BenchConfig {
        data_path: dir.path().to_path_buf(),
        train_rows: 30,
        test_rows: 10,
        params: BoosterParams {
            n_estimators: 8,
            ..BoosterParams::default()
        },
        backend: Backend::Simulated,
        layout: DatasetLayout {
            text_file: "small.txt".to_string(),
            snapshot_file: "small.bin".to_string(),
            feature_count: 3,
            expected_rows: Some(ROWS),
        },
    }
}

#[test]
fn runs_end_to_end_on_the_simulated_backend() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let config = config(&dir);
    let api = SimulatedApi::shared();

    let report = run_benchmark(&config, api.clone()).unwrap();
    assert_eq!(report.train_rows, 30);
    assert_eq!(report.test_rows, 10);
    assert_eq!(report.features, 3);
    assert_eq!(report.rounds, 8);
    assert_eq!(report.positives, 5);
    assert!(report.to_string().starts_with("Run time: "));

    assert!(dir.path().join("small.bin").is_file());
    assert_eq!(api.live_matrices(), 0);
    assert_eq!(api.live_boosters(), 0);
}

#[test]
fn second_run_reads_the_snapshot() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let config = config(&dir);

    run_benchmark(&config, SimulatedApi::shared()).unwrap();
    fs::remove_file(dir.path().join("small.txt")).unwrap();
    let report = run_benchmark(&config, SimulatedApi::shared()).unwrap();
    assert_eq!(report.test_rows, 10);
}

#[test]
fn oversized_windows_fail_with_a_shape_error() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let mut config = config(&dir);
    config.train_rows = ROWS;

    let err = run_benchmark(&config, SimulatedApi::shared()).unwrap_err();
    assert!(matches!(err, BenchError::Core(XgbError::Shape(_))));
}

#[test]
fn missing_dataset_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = run_benchmark(&config(&dir), SimulatedApi::shared()).unwrap_err();
    assert!(matches!(err, BenchError::Core(XgbError::Io(_))));
}
