//! Safe bindings over the XGBoost C API
//!
//! Owns native matrices and learners behind RAII handles, marshals row data
//! and parameters across the boundary, and caches parsed datasets on disk.
//!
//! Modules:
//! - `api`: The [`XgbApi`] seam mirroring the C entry points
//! - `sys`: Raw `extern "C"` declarations (feature `native`)
//! - `native`: [`XgbApi`] backed by the linked library (feature `native`)
//! - `simulated`: In-process [`XgbApi`] for tests and offline runs
//! - `dmatrix`: Dataset handle
//! - `booster`: Model handle
//! - `params`: Typed learner parameters
//! - `learner`: Train-once, predict-many classifier
//! - `dataset`: Text ingestion and binary snapshot cache

pub mod api;
pub mod booster;
pub mod dataset;
pub mod dmatrix;
pub mod errors;
pub mod learner;
#[cfg(feature = "native")]
pub mod native;
pub mod params;
pub mod simulated;
pub mod sys;

pub use api::XgbApi;
pub use booster::Booster;
pub use dataset::{load, slice, slice_with, CachedDataset, DatasetLayout, SliceWindows};
pub use dmatrix::{flatten, unflatten, DMatrix};
pub use errors::{Result, XgbError};
pub use learner::{threshold_labels, Learner, DECISION_THRESHOLD};
#[cfg(feature = "native")]
pub use native::NativeApi;
pub use params::{BoosterParams, ParamValue};
pub use simulated::SimulatedApi;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// True when the crate was built against the native library.
pub fn native_available() -> bool {
    cfg!(feature = "native")
}
