use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use xgbench::config::{ENV_BACKEND, ENV_DATA_PATH, ENV_TEST_ROWS, ENV_TRAIN_ROWS};
use xgbench::{Backend, BenchConfig, BenchError, Overrides};
use xgbench_core::params::TreeMethod;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appconfig.json");
    fs::write(
        &path,
        r#"{
            "data_path": "/srv/msd",
            "train_rows": 2000,
            "backend": "simulated",
            "params": { "n_estimators": 25, "tree_method": "hist" }
        }"#,
    )
    .unwrap();

    let config = BenchConfig::from_file(&path).unwrap();
    assert_eq!(config.data_path, PathBuf::from("/srv/msd"));
    assert_eq!(config.train_rows, 2000);
    assert_eq!(config.test_rows, 1000);
    assert_eq!(config.backend, Backend::Simulated);
    assert_eq!(config.params.n_estimators, 25);
    assert_eq!(config.params.tree_method, TreeMethod::Hist);
    assert_eq!(config.params.max_depth, 3);
}

#[test]
fn env_overrides_file_and_cli_overrides_env() {
    let mut config = BenchConfig::from_json(r#"{"train_rows": 50, "test_rows": 5}"#).unwrap();

    config
        .apply_env_from(env(&[
            (ENV_DATA_PATH, "/from/env"),
            (ENV_TRAIN_ROWS, "70"),
            (ENV_TEST_ROWS, "7"),
            (ENV_BACKEND, "simulated"),
        ]))
        .unwrap();
    assert_eq!(config.data_path, PathBuf::from("/from/env"));
    assert_eq!(config.train_rows, 70);
    assert_eq!(config.test_rows, 7);

    config.apply_overrides(&Overrides {
        train_rows: Some(90),
        ..Overrides::default()
    });
    assert_eq!(config.train_rows, 90);
    assert_eq!(config.test_rows, 7);
    assert_eq!(config.data_path, PathBuf::from("/from/env"));
}

#[test]
fn unknown_backend_in_env_is_rejected() {
    let mut config = BenchConfig::default();
    let err = config
        .apply_env_from(env(&[(ENV_BACKEND, "cuda")]))
        .unwrap_err();
    assert!(matches!(err, BenchError::Config(_)));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = BenchConfig::load_or_default(dir.path().join("custom.json")).unwrap_err();
    assert!(matches!(err, BenchError::ConfigRead { .. }));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let err = BenchConfig::from_json(r#"{"train_rows": "many"}"#).unwrap_err();
    assert!(matches!(err, BenchError::ConfigParse(_)));
}
