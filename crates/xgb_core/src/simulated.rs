//! In-process backend that honors the binding contract without libxgboost.
//!
//! Handles are opaque non-null integers, failures return the `-1` sentinel and
//! leave a thread-local last-error message, and prediction buffers stay owned
//! by the learner that produced them, exactly like the native library. Each
//! boosting round fits one squared-error decision stump to the residuals.
//!
//! The backend also keeps the books tests need: live handle counts, a call
//! log, and per-entry-point fault injection.

use libc::{c_int, c_uint, c_void};
use parking_lot::{Mutex, MutexGuard};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::CStr;
use std::ptr;
use std::sync::Arc;

use crate::api::{entry, XgbApi, STATUS_FAILED, STATUS_OK};
use crate::sys::{bst_ulong, BoosterHandle, DMatrixHandle};

const DEFAULT_ETA: f32 = 0.3;
const DEFAULT_BASE_SCORE: f32 = 0.5;

/// Float info fields that must hold one value per row.
const ROW_FIELDS: &[&str] = &["label", "weight", "base_margin"];
/// Float info fields accepted with any length.
const FREE_FIELDS: &[&str] = &["label_lower_bound", "label_upper_bound", "feature_weights"];

/// Parameters parsed as floats when set.
const FLOAT_PARAMS: &[&str] = &[
    "learning_rate",
    "eta",
    "base_score",
    "gamma",
    "subsample",
    "colsample_bytree",
    "colsample_bylevel",
    "reg_alpha",
    "reg_lambda",
    "scale_pos_weight",
    "rate_drop",
    "skip_drop",
];

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn fail(message: impl Into<String>) -> c_int {
    let message = message.into();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
    STATUS_FAILED
}

fn to_handle(id: usize) -> *mut c_void {
    id as *mut c_void
}

fn to_id(handle: *mut c_void) -> usize {
    handle as usize
}

struct SimMatrix {
    data: Vec<f32>,
    nrow: usize,
    ncol: usize,
    missing: f32,
    info: HashMap<String, Vec<f32>>,
}

impl SimMatrix {
    fn value(&self, row: usize, col: usize) -> Option<f32> {
        let v = self.data[row * self.ncol + col];
        if v.is_nan() || v == self.missing {
            None
        } else {
            Some(v)
        }
    }
}

/// One-split tree. Missing values and values at or below the threshold go left.
#[derive(Clone, Copy, Debug)]
struct Stump {
    split: Option<(usize, f32)>,
    left: f32,
    right: f32,
}

impl Stump {
    fn score(&self, matrix: &SimMatrix, row: usize) -> f32 {
        match self.split {
            Some((feature, threshold)) => match matrix.value(row, feature) {
                Some(v) if v > threshold => self.right,
                _ => self.left,
            },
            None => self.left,
        }
    }
}

#[derive(Default)]
struct SimBooster {
    params: BTreeMap<String, String>,
    stumps: Vec<Stump>,
    rounds: Vec<i32>,
    output: Vec<f32>,
}

impl SimBooster {
    fn param_f32(&self, keys: &[&str], default: f32) -> f32 {
        keys.iter()
            .find_map(|key| self.params.get(*key))
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    fn raw_scores(&self, matrix: &SimMatrix, tree_limit: usize) -> Vec<f32> {
        let base = self.param_f32(&["base_score"], DEFAULT_BASE_SCORE);
        let used = if tree_limit == 0 {
            self.stumps.len()
        } else {
            tree_limit.min(self.stumps.len())
        };
        (0..matrix.nrow)
            .map(|row| {
                self.stumps[..used]
                    .iter()
                    .fold(base, |acc, stump| acc + stump.score(matrix, row))
            })
            .collect()
    }

    fn widest_feature(&self) -> Option<usize> {
        self.stumps
            .iter()
            .filter_map(|stump| stump.split.map(|(feature, _)| feature))
            .max()
    }
}

fn fit_stump(matrix: &SimMatrix, residuals: &[f32], weights: Option<&[f32]>, eta: f32) -> Stump {
    let weight = |row: usize| weights.map_or(1.0, |w| f64::from(w[row]));
    let leaf = |sum_r: f64, sum_w: f64| {
        if sum_w > 0.0 {
            (sum_r / sum_w) as f32 * eta
        } else {
            0.0
        }
    };

    let (total_r, total_w) = residuals
        .iter()
        .enumerate()
        .fold((0.0f64, 0.0f64), |(r, w), (row, &res)| {
            (r + weight(row) * f64::from(res), w + weight(row))
        });

    let constant = leaf(total_r, total_w);
    let mut best = Stump {
        split: None,
        left: constant,
        right: constant,
    };
    let mut best_gain = if total_w > 0.0 {
        total_r * total_r / total_w
    } else {
        0.0
    };

    for feature in 0..matrix.ncol {
        let present: Vec<f64> = (0..matrix.nrow)
            .filter_map(|row| matrix.value(row, feature))
            .map(f64::from)
            .collect();
        if present.is_empty() {
            continue;
        }
        let threshold = (present.iter().sum::<f64>() / present.len() as f64) as f32;

        let (mut left_r, mut left_w, mut right_r, mut right_w) = (0.0, 0.0, 0.0, 0.0);
        for (row, &res) in residuals.iter().enumerate() {
            let w = weight(row);
            match matrix.value(row, feature) {
                Some(v) if v > threshold => {
                    right_r += w * f64::from(res);
                    right_w += w;
                }
                _ => {
                    left_r += w * f64::from(res);
                    left_w += w;
                }
            }
        }
        if left_w <= 0.0 || right_w <= 0.0 {
            continue;
        }

        let gain = left_r * left_r / left_w + right_r * right_r / right_w;
        if gain > best_gain {
            best_gain = gain;
            best = Stump {
                split: Some((feature, threshold)),
                left: leaf(left_r, left_w),
                right: leaf(right_r, right_w),
            };
        }
    }

    best
}

#[derive(Default)]
struct State {
    next_id: usize,
    matrices: HashMap<usize, SimMatrix>,
    boosters: HashMap<usize, SimBooster>,
    faults: HashMap<&'static str, String>,
    calls: Vec<&'static str>,
}

impl State {
    fn allocate(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

/// Simulated XGBoost C API.
#[derive(Default)]
pub struct SimulatedApi {
    state: Mutex<State>,
}

impl SimulatedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for constructing matrices and learners.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make every later call to `entry_point` fail with `message`.
    pub fn fail_on(&self, entry_point: &'static str, message: impl Into<String>) {
        self.state.lock().faults.insert(entry_point, message.into());
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Matrices created and not yet freed.
    pub fn live_matrices(&self) -> usize {
        self.state.lock().matrices.len()
    }

    /// Learners created and not yet freed.
    pub fn live_boosters(&self) -> usize {
        self.state.lock().boosters.len()
    }

    /// Number of calls made to `entry_point`, including failed ones.
    pub fn call_count(&self, entry_point: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|name| **name == entry_point)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Parameters recorded on a live learner, as the strings it received.
    pub fn booster_params(&self, handle: BoosterHandle) -> Option<BTreeMap<String, String>> {
        self.state
            .lock()
            .boosters
            .get(&to_id(handle))
            .map(|booster| booster.params.clone())
    }

    /// Round indices passed to `XGBoosterUpdateOneIter`, in call order.
    pub fn booster_rounds(&self, handle: BoosterHandle) -> Option<Vec<i32>> {
        self.state
            .lock()
            .boosters
            .get(&to_id(handle))
            .map(|booster| booster.rounds.clone())
    }

    /// The row-major buffer a live matrix was created from.
    pub fn matrix_data(&self, handle: DMatrixHandle) -> Option<(Vec<f32>, usize, usize)> {
        self.state
            .lock()
            .matrices
            .get(&to_id(handle))
            .map(|m| (m.data.clone(), m.nrow, m.ncol))
    }

    /// Record the call and return the state, or fail if a fault is armed.
    fn enter(&self, entry_point: &'static str) -> Option<MutexGuard<'_, State>> {
        let mut state = self.state.lock();
        state.calls.push(entry_point);
        if let Some(message) = state.faults.get(entry_point) {
            fail(message.clone());
            return None;
        }
        Some(state)
    }
}

impl XgbApi for SimulatedApi {
    fn last_error(&self) -> String {
        LAST_ERROR.with(|slot| slot.borrow().clone())
    }

    unsafe fn dmatrix_create_from_mat(
        &self,
        data: &[f32],
        nrow: bst_ulong,
        ncol: bst_ulong,
        missing: f32,
        out: &mut DMatrixHandle,
    ) -> c_int {
        let Some(mut state) = self.enter(entry::DMATRIX_CREATE_FROM_MAT) else {
            return STATUS_FAILED;
        };
        let (nrow, ncol) = (nrow as usize, ncol as usize);
        if nrow.checked_mul(ncol) != Some(data.len()) {
            return fail(format!(
                "buffer holds {} values, expected {nrow} x {ncol}",
                data.len()
            ));
        }

        let id = state.allocate();
        state.matrices.insert(
            id,
            SimMatrix {
                data: data.to_vec(),
                nrow,
                ncol,
                missing,
                info: HashMap::new(),
            },
        );
        *out = to_handle(id);
        STATUS_OK
    }

    unsafe fn dmatrix_free(&self, handle: DMatrixHandle) -> c_int {
        let Some(mut state) = self.enter(entry::DMATRIX_FREE) else {
            return STATUS_FAILED;
        };
        match state.matrices.remove(&to_id(handle)) {
            Some(_) => STATUS_OK,
            None => fail(format!("unknown DMatrix handle {:p}", handle)),
        }
    }

    unsafe fn dmatrix_set_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        array: &[f32],
    ) -> c_int {
        let Some(mut state) = self.enter(entry::DMATRIX_SET_FLOAT_INFO) else {
            return STATUS_FAILED;
        };
        let field = field.to_string_lossy();
        let Some(matrix) = state.matrices.get_mut(&to_id(handle)) else {
            return fail(format!("unknown DMatrix handle {:p}", handle));
        };

        let name: &str = &field;
        if ROW_FIELDS.contains(&name) {
            if array.len() != matrix.nrow {
                return fail(format!(
                    "size of {field} ({}) must equal the number of rows ({})",
                    array.len(),
                    matrix.nrow
                ));
            }
        } else if !FREE_FIELDS.contains(&name) {
            return fail(format!("unknown float field name: {field}"));
        }

        matrix.info.insert(field.into_owned(), array.to_vec());
        STATUS_OK
    }

    unsafe fn dmatrix_get_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        out_len: &mut bst_ulong,
        out_dptr: &mut *const f32,
    ) -> c_int {
        let Some(state) = self.enter(entry::DMATRIX_GET_FLOAT_INFO) else {
            return STATUS_FAILED;
        };
        let field = field.to_string_lossy();
        let Some(matrix) = state.matrices.get(&to_id(handle)) else {
            return fail(format!("unknown DMatrix handle {:p}", handle));
        };
        let name: &str = &field;
        if !ROW_FIELDS.contains(&name) && !FREE_FIELDS.contains(&name) {
            return fail(format!("unknown float field name: {name}"));
        }

        match matrix.info.get(name) {
            Some(values) => {
                *out_len = values.len() as bst_ulong;
                *out_dptr = values.as_ptr();
            }
            None => {
                *out_len = 0;
                *out_dptr = ptr::null();
            }
        }
        STATUS_OK
    }

    unsafe fn booster_create(&self, dmats: &[DMatrixHandle], out: &mut BoosterHandle) -> c_int {
        let Some(mut state) = self.enter(entry::BOOSTER_CREATE) else {
            return STATUS_FAILED;
        };
        if let Some(missing) = dmats
            .iter()
            .find(|h| !state.matrices.contains_key(&to_id(**h)))
        {
            return fail(format!("unknown DMatrix handle {:p}", *missing));
        }

        let id = state.allocate();
        state.boosters.insert(id, SimBooster::default());
        *out = to_handle(id);
        STATUS_OK
    }

    unsafe fn booster_free(&self, handle: BoosterHandle) -> c_int {
        let Some(mut state) = self.enter(entry::BOOSTER_FREE) else {
            return STATUS_FAILED;
        };
        match state.boosters.remove(&to_id(handle)) {
            Some(_) => STATUS_OK,
            None => fail(format!("unknown Booster handle {:p}", handle)),
        }
    }

    unsafe fn booster_set_param(
        &self,
        handle: BoosterHandle,
        name: &CStr,
        value: &CStr,
    ) -> c_int {
        let Some(mut state) = self.enter(entry::BOOSTER_SET_PARAM) else {
            return STATUS_FAILED;
        };
        let Some(booster) = state.boosters.get_mut(&to_id(handle)) else {
            return fail(format!("unknown Booster handle {:p}", handle));
        };
        let name = name.to_string_lossy().into_owned();
        let value = value.to_string_lossy().into_owned();

        if FLOAT_PARAMS.contains(&name.as_str()) && value.parse::<f32>().is_err() {
            return fail(format!(
                "Invalid Parameter format for {name} expect float but value='{value}'"
            ));
        }

        booster.params.insert(name, value);
        STATUS_OK
    }

    unsafe fn booster_update_one_iter(
        &self,
        handle: BoosterHandle,
        iter: c_int,
        dtrain: DMatrixHandle,
    ) -> c_int {
        let Some(mut guard) = self.enter(entry::BOOSTER_UPDATE_ONE_ITER) else {
            return STATUS_FAILED;
        };
        let state = &mut *guard;
        let Some(matrix) = state.matrices.get(&to_id(dtrain)) else {
            return fail(format!("unknown DMatrix handle {:p}", dtrain));
        };
        let Some(booster) = state.boosters.get_mut(&to_id(handle)) else {
            return fail(format!("unknown Booster handle {:p}", handle));
        };
        let labels = match matrix.info.get("label") {
            Some(labels) if !labels.is_empty() => labels,
            _ => return fail("label is not set on the training matrix"),
        };
        if let Some(feature) = booster.widest_feature() {
            if feature >= matrix.ncol {
                return fail(format!(
                    "training matrix has {} columns, model uses feature {feature}",
                    matrix.ncol
                ));
            }
        }

        let eta = booster.param_f32(&["learning_rate", "eta"], DEFAULT_ETA);
        let residuals: Vec<f32> = booster
            .raw_scores(matrix, 0)
            .iter()
            .zip(labels)
            .map(|(score, label)| label - score)
            .collect();
        let weights = matrix.info.get("weight").map(Vec::as_slice);

        let stump = fit_stump(matrix, &residuals, weights, eta);
        booster.stumps.push(stump);
        booster.rounds.push(iter);
        STATUS_OK
    }

    unsafe fn booster_predict(
        &self,
        handle: BoosterHandle,
        dmat: DMatrixHandle,
        option_mask: c_int,
        ntree_limit: c_uint,
        out_len: &mut bst_ulong,
        out_result: &mut *const f32,
    ) -> c_int {
        let Some(mut guard) = self.enter(entry::BOOSTER_PREDICT) else {
            return STATUS_FAILED;
        };
        let state = &mut *guard;
        // Bit 0 (margin) is the identity for squared error; other modes are not modelled.
        if option_mask & !1 != 0 {
            return fail(format!("prediction option mask {option_mask} is not supported"));
        }
        let Some(matrix) = state.matrices.get(&to_id(dmat)) else {
            return fail(format!("unknown DMatrix handle {:p}", dmat));
        };
        let Some(booster) = state.boosters.get_mut(&to_id(handle)) else {
            return fail(format!("unknown Booster handle {:p}", handle));
        };
        if let Some(feature) = booster.widest_feature() {
            if feature >= matrix.ncol {
                return fail(format!(
                    "feature count mismatch: model uses feature {feature}, matrix has {} columns",
                    matrix.ncol
                ));
            }
        }

        booster.output = booster.raw_scores(matrix, ntree_limit as usize);
        *out_len = booster.output.len() as bst_ulong;
        *out_result = booster.output.as_ptr();
        STATUS_OK
    }
}
