//! Binding surface shared by the native library and the simulated backend.
//!
//! [`XgbApi`] mirrors the C contract one method per entry point: integer
//! status, out-parameters, opaque handles. Handle wrappers never look at a
//! status themselves; they go through [`xgb_call!`], which turns the failure
//! sentinel into [`XgbError::NativeCall`] carrying the last-error string read
//! right after the failing call.

use libc::{c_int, c_uint};
use std::ffi::CStr;
use std::slice;

use crate::errors::{Result, XgbError};
use crate::sys::{bst_ulong, BoosterHandle, DMatrixHandle};

/// Names of the entry points, used in error messages and fault injection.
pub mod entry {
    pub const DMATRIX_CREATE_FROM_MAT: &str = "XGDMatrixCreateFromMat";
    pub const DMATRIX_FREE: &str = "XGDMatrixFree";
    pub const DMATRIX_SET_FLOAT_INFO: &str = "XGDMatrixSetFloatInfo";
    pub const DMATRIX_GET_FLOAT_INFO: &str = "XGDMatrixGetFloatInfo";
    pub const BOOSTER_CREATE: &str = "XGBoosterCreate";
    pub const BOOSTER_FREE: &str = "XGBoosterFree";
    pub const BOOSTER_SET_PARAM: &str = "XGBoosterSetParam";
    pub const BOOSTER_UPDATE_ONE_ITER: &str = "XGBoosterUpdateOneIter";
    pub const BOOSTER_PREDICT: &str = "XGBoosterPredict";
}

/// Status returned by every entry point on success.
pub const STATUS_OK: c_int = 0;

/// Status returned by every entry point on failure.
pub const STATUS_FAILED: c_int = -1;

/// Width in bytes of one element of a native float buffer.
pub const F32_WIDTH: usize = 4;

/// The foreign-call contract of the gradient boosting library.
///
/// # Safety
///
/// Handles passed in must have been produced by the same implementation and
/// not yet freed. Pointers written to out-parameters stay owned by the
/// implementation: a prediction buffer is valid until the next call on the
/// same learner or until the learner is freed.
pub trait XgbApi {
    /// Message for the most recent failed call on the calling thread.
    fn last_error(&self) -> String;

    /// # Safety
    /// `data.len()` must equal `nrow * ncol`.
    unsafe fn dmatrix_create_from_mat(
        &self,
        data: &[f32],
        nrow: bst_ulong,
        ncol: bst_ulong,
        missing: f32,
        out: &mut DMatrixHandle,
    ) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn dmatrix_free(&self, handle: DMatrixHandle) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn dmatrix_set_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        array: &[f32],
    ) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn dmatrix_get_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        out_len: &mut bst_ulong,
        out_dptr: &mut *const f32,
    ) -> c_int;

    /// # Safety
    /// Every handle in `dmats` must be live.
    unsafe fn booster_create(&self, dmats: &[DMatrixHandle], out: &mut BoosterHandle) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn booster_free(&self, handle: BoosterHandle) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn booster_set_param(&self, handle: BoosterHandle, name: &CStr, value: &CStr)
        -> c_int;

    /// # Safety
    /// Both handles must be live.
    unsafe fn booster_update_one_iter(
        &self,
        handle: BoosterHandle,
        iter: c_int,
        dtrain: DMatrixHandle,
    ) -> c_int;

    /// # Safety
    /// Both handles must be live.
    unsafe fn booster_predict(
        &self,
        handle: BoosterHandle,
        dmat: DMatrixHandle,
        option_mask: c_int,
        ntree_limit: c_uint,
        out_len: &mut bst_ulong,
        out_result: &mut *const f32,
    ) -> c_int;
}

/// Convert a raw status into a `Result`, reading the last error on failure.
pub fn check_status(api: &dyn XgbApi, entry: &'static str, status: c_int) -> Result<()> {
    if status == STATUS_OK {
        return Ok(());
    }

    let message = api.last_error();
    tracing::debug!(entry, status, %message, "native call failed");
    Err(XgbError::NativeCall { entry, message })
}

/// Invoke one binding entry point and check its status.
///
/// `xgb_call!(api, entry::NAME, api.method(args))`. The call runs inside an
/// `unsafe` block; the caller is responsible for handle liveness.
macro_rules! xgb_call {
    ($api:expr, $entry:expr, $call:expr) => {
        $crate::api::check_status(&*$api, $entry, unsafe { $call })
    };
}
pub(crate) use xgb_call;

/// Copy `len` native-endian `f32` values starting at `ptr` into an owned vector.
///
/// This is the only place raw native output is reinterpreted: exactly
/// [`F32_WIDTH`] bytes are read per element, with no alignment assumption.
///
/// # Safety
///
/// When `len > 0`, `ptr` must point to at least `len * 4` readable bytes that
/// stay valid for the duration of the call.
pub unsafe fn decode_f32_buffer(
    entry: &'static str,
    ptr: *const f32,
    len: bst_ulong,
) -> Result<Vec<f32>> {
    let count = usize::try_from(len).map_err(|_| XgbError::NativeCall {
        entry,
        message: format!("result length {len} does not fit in memory"),
    })?;
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(XgbError::NativeCall {
            entry,
            message: format!("null result buffer for {count} values"),
        });
    }
    let byte_len = count.checked_mul(F32_WIDTH).ok_or_else(|| XgbError::NativeCall {
        entry,
        message: format!("result length {count} overflows"),
    })?;

    let bytes = slice::from_raw_parts(ptr.cast::<u8>(), byte_len);
    Ok(bytes
        .chunks_exact(F32_WIDTH)
        .map(|word| f32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}
