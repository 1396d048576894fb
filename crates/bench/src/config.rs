//! Runner configuration
//!
//! Values come from, in increasing precedence: built-in defaults, the JSON
//! config file, `XGBENCH_*` environment variables, and CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use xgbench_core::{BoosterParams, DatasetLayout, SimulatedApi, XgbApi};

use crate::errors::{BenchError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "appconfig.json";
pub const DEFAULT_TRAIN_ROWS: usize = 10_000;
pub const DEFAULT_TEST_ROWS: usize = 1_000;

pub const ENV_DATA_PATH: &str = "XGBENCH_DATA_PATH";
pub const ENV_TRAIN_ROWS: &str = "XGBENCH_TRAIN_ROWS";
pub const ENV_TEST_ROWS: &str = "XGBENCH_TEST_ROWS";
pub const ENV_BACKEND: &str = "XGBENCH_BACKEND";

/// Which binding implementation drives the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The linked libxgboost
    Native,
    /// The in-process simulated library
    Simulated,
}

impl Backend {
    /// Native when the binary links libxgboost, simulated otherwise.
    pub fn for_build() -> Self {
        if xgbench_core::native_available() {
            Backend::Native
        } else {
            Backend::Simulated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Simulated => "simulated",
        }
    }
}

impl FromStr for Backend {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            "simulated" => Ok(Backend::Simulated),
            other => Err(BenchError::Config(format!("unknown backend {other:?}"))),
        }
    }
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Directory holding the text dataset and its snapshot.
    pub data_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
    pub params: BoosterParams,
    pub backend: Backend,
    #[serde(skip)]
    pub layout: DatasetLayout,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            train_rows: DEFAULT_TRAIN_ROWS,
            test_rows: DEFAULT_TEST_ROWS,
            params: BoosterParams::default(),
            backend: Backend::for_build(),
            layout: DatasetLayout::year_prediction_msd(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_path: Option<PathBuf>,
    pub train_rows: Option<usize>,
    pub test_rows: Option<usize>,
    pub backend: Option<Backend>,
}

impl BenchConfig {
    /// Parse a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load `path` if it exists. A missing file is only tolerated when it is
    /// the default config name.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
            info!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Apply `XGBENCH_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `XGBENCH_*` overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_DATA_PATH) {
            self.data_path = PathBuf::from(val);
        }
        if let Some(val) = lookup(ENV_TRAIN_ROWS) {
            self.train_rows = parse_rows(ENV_TRAIN_ROWS, &val)?;
        }
        if let Some(val) = lookup(ENV_TEST_ROWS) {
            self.test_rows = parse_rows(ENV_TEST_ROWS, &val)?;
        }
        if let Some(val) = lookup(ENV_BACKEND) {
            self.backend = val.parse()?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(path) = &overrides.data_path {
            self.data_path = path.clone();
        }
        if let Some(rows) = overrides.train_rows {
            self.train_rows = rows;
        }
        if let Some(rows) = overrides.test_rows {
            self.test_rows = rows;
        }
        if let Some(backend) = overrides.backend {
            self.backend = backend;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.train_rows == 0 {
            return Err(BenchError::Config("train_rows must be non-zero".into()));
        }
        if self.test_rows == 0 {
            return Err(BenchError::Config("test_rows must be non-zero".into()));
        }
        if self.backend == Backend::Native && !xgbench_core::native_available() {
            return Err(BenchError::Config(
                "native backend requested but this build does not link libxgboost (enable the `native` feature)"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Binding implementation for the configured backend.
    pub fn make_api(&self) -> Result<Arc<dyn XgbApi>> {
        match self.backend {
            Backend::Simulated => Ok(SimulatedApi::shared() as Arc<dyn XgbApi>),
            Backend::Native => native_api(),
        }
    }
}

#[cfg(feature = "native")]
fn native_api() -> Result<Arc<dyn XgbApi>> {
    Ok(xgbench_core::NativeApi::shared())
}

#[cfg(not(feature = "native"))]
fn native_api() -> Result<Arc<dyn XgbApi>> {
    Err(BenchError::Config(
        "native backend is not compiled into this build".into(),
    ))
}

fn parse_rows(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| BenchError::Config(format!("{key} must be a row count, got {value:?}")))
}
