//! Dataset cache
//!
//! Parses a headerless, comma-delimited text dataset (label first, then the
//! features) once, persists it as a binary snapshot next to the text file, and
//! serves every later load straight from the snapshot until it is deleted.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::{Result, XgbError};

/// Training rows and labels plus an optional held-out window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedDataset {
    pub train_data: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
    pub test_data: Option<Vec<Vec<f32>>>,
    pub test_labels: Option<Vec<f32>>,
}

impl CachedDataset {
    pub fn num_rows(&self) -> usize {
        self.train_data.len()
    }

    pub fn num_features(&self) -> usize {
        self.train_data.first().map_or(0, Vec::len)
    }

    pub fn num_test_rows(&self) -> usize {
        self.test_data.as_ref().map_or(0, Vec::len)
    }

    /// Equality on dimensions and float bit patterns, so NaN compares equal to itself.
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        fn rows_eq(a: &[Vec<f32>], b: &[Vec<f32>]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_eq(x, y))
        }
        fn values_eq(a: &[f32], b: &[f32]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }

        rows_eq(&self.train_data, &other.train_data)
            && values_eq(&self.labels, &other.labels)
            && match (&self.test_data, &other.test_data) {
                (Some(a), Some(b)) => rows_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && match (&self.test_labels, &other.test_labels) {
                (Some(a), Some(b)) => values_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// File names and shape of a text dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub text_file: String,
    pub snapshot_file: String,
    pub feature_count: usize,
    /// Rows to keep; fewer is an error, extra rows are dropped.
    pub expected_rows: Option<usize>,
}

impl DatasetLayout {
    pub const YEAR_PREDICTION_ROWS: usize = 515_345;
    pub const YEAR_PREDICTION_FEATURES: usize = 90;

    /// The YearPredictionMSD dataset from the UCI repository.
    pub fn year_prediction_msd() -> Self {
        Self {
            text_file: "YearPredictionMSD.txt".to_string(),
            snapshot_file: "YearPredictionMSD.bin".to_string(),
            feature_count: Self::YEAR_PREDICTION_FEATURES,
            expected_rows: Some(Self::YEAR_PREDICTION_ROWS),
        }
    }

    pub fn text_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.text_file)
    }

    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.snapshot_file)
    }

    /// Label plus features.
    pub fn fields_per_row(&self) -> usize {
        self.feature_count + 1
    }
}

/// Load from the snapshot in `dir` if present, otherwise parse the text file
/// and write the snapshot for next time.
pub fn load(dir: &Path, layout: &DatasetLayout) -> Result<CachedDataset> {
    let snapshot = layout.snapshot_path(dir);
    if snapshot.is_file() {
        info!(path = %snapshot.display(), "loading dataset snapshot");
        return read_snapshot(&snapshot);
    }

    let text = layout.text_path(dir);
    info!(path = %text.display(), "no snapshot found, parsing text dataset");
    let dataset = parse_text(&text, layout)?;
    write_snapshot(&snapshot, &dataset)?;
    info!(
        path = %snapshot.display(),
        rows = dataset.num_rows(),
        "wrote dataset snapshot"
    );
    Ok(dataset)
}

/// Parse a text dataset into features and labels.
pub fn parse_text(path: &Path, layout: &DatasetLayout) -> Result<CachedDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let capacity = layout.expected_rows.unwrap_or(0);
    let mut train_data = Vec::with_capacity(capacity);
    let mut labels = Vec::with_capacity(capacity);
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record).map_err(csv_error)? {
        let line = record
            .position()
            .map_or(train_data.len() as u64 + 1, |pos| pos.line());
        if record.len() != layout.fields_per_row() {
            return Err(XgbError::Ingestion {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    layout.fields_per_row(),
                    record.len()
                ),
            });
        }

        labels.push(parse_field(&record[0], line, 0)?);
        let features = record
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, field)| parse_field(field, line, idx))
            .collect::<Result<Vec<f32>>>()?;
        train_data.push(features);

        if layout.expected_rows == Some(train_data.len()) {
            if reader.read_record(&mut record).map_err(csv_error)? {
                warn!(
                    kept = train_data.len(),
                    "dataset has more rows than expected, dropping the rest"
                );
            }
            break;
        }
    }

    if let Some(expected) = layout.expected_rows {
        if train_data.len() < expected {
            return Err(XgbError::Ingestion {
                line: train_data.len() as u64,
                reason: format!("expected {expected} rows, found {}", train_data.len()),
            });
        }
    }
    if train_data.is_empty() {
        return Err(XgbError::Ingestion {
            line: 0,
            reason: "dataset is empty".to_string(),
        });
    }

    Ok(CachedDataset {
        train_data,
        labels,
        test_data: None,
        test_labels: None,
    })
}

fn parse_field(field: &str, line: u64, idx: usize) -> Result<f32> {
    field.parse::<f32>().map_err(|_| XgbError::Ingestion {
        line,
        reason: format!("field {idx} ({field:?}) is not a number"),
    })
}

fn csv_error(err: csv::Error) -> XgbError {
    let line = err.position().map_or(0, |pos| pos.line());
    match err.into_kind() {
        csv::ErrorKind::Io(io) => XgbError::Io(io),
        kind => XgbError::Ingestion {
            line,
            reason: format!("{kind:?}"),
        },
    }
}

/// Encode a dataset in the snapshot format.
pub fn to_snapshot_bytes(dataset: &CachedDataset) -> Result<Vec<u8>> {
    Ok(bincode::serialize(dataset)?)
}

/// Decode a dataset from the snapshot format.
pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<CachedDataset> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<CachedDataset> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Write a snapshot file via a temporary sibling, so a partial write never
/// sits at `path`.
pub fn write_snapshot(path: &Path, dataset: &CachedDataset) -> Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut writer, dataset)?;
        writer.flush()?;
        Ok(())
    })();
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Row windows carved out of a full dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceWindows {
    pub train_start: usize,
    pub train_rows: usize,
    pub test_start: usize,
    pub test_rows: usize,
}

impl SliceWindows {
    /// Test rows from the top of the file, training rows right after them.
    pub fn benchmark(train_rows: usize, test_rows: usize) -> Self {
        Self {
            train_start: test_rows,
            train_rows,
            test_start: 0,
            test_rows,
        }
    }
}

/// Slice the default benchmark windows out of `full`.
pub fn slice(full: &CachedDataset, train_rows: usize, test_rows: usize) -> Result<CachedDataset> {
    slice_with(full, SliceWindows::benchmark(train_rows, test_rows))
}

/// Slice arbitrary windows out of `full`. The result carries no test labels.
pub fn slice_with(full: &CachedDataset, windows: SliceWindows) -> Result<CachedDataset> {
    let total = full.num_rows();
    if full.labels.len() != total {
        return Err(XgbError::shape(format!(
            "{} labels for {total} rows",
            full.labels.len()
        )));
    }
    if windows.train_rows == 0 {
        return Err(XgbError::shape("training window is empty"));
    }
    let train = window("training", windows.train_start, windows.train_rows, total)?;
    let test = window("test", windows.test_start, windows.test_rows, total)?;

    Ok(CachedDataset {
        train_data: full.train_data[train.clone()].to_vec(),
        labels: full.labels[train].to_vec(),
        test_data: Some(full.train_data[test].to_vec()),
        test_labels: None,
    })
}

fn window(name: &str, start: usize, len: usize, total: usize) -> Result<std::ops::Range<usize>> {
    match start.checked_add(len) {
        Some(end) if end <= total => Ok(start..end),
        _ => Err(XgbError::shape(format!(
            "{name} window [{start}, {start}+{len}) exceeds {total} rows"
        ))),
    }
}
