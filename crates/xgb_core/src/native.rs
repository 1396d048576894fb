//! [`XgbApi`] over the linked libxgboost.

use libc::{c_int, c_uint};
use std::ffi::CStr;
use std::sync::Arc;

use crate::api::XgbApi;
use crate::sys::{self, bst_ulong, BoosterHandle, DMatrixHandle};

/// Calls straight through to the C API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeApi;

impl NativeApi {
    pub fn new() -> Self {
        Self
    }

    /// Shared handle for constructing matrices and learners.
    pub fn shared() -> Arc<dyn XgbApi> {
        Arc::new(Self)
    }
}

impl XgbApi for NativeApi {
    fn last_error(&self) -> String {
        // SAFETY: XGBGetLastError returns a thread-local, NUL-terminated string
        // owned by the library; it is copied before any further call.
        unsafe {
            let raw = sys::XGBGetLastError();
            if raw.is_null() {
                return String::from("unknown native error");
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        }
    }

    unsafe fn dmatrix_create_from_mat(
        &self,
        data: &[f32],
        nrow: bst_ulong,
        ncol: bst_ulong,
        missing: f32,
        out: &mut DMatrixHandle,
    ) -> c_int {
        sys::XGDMatrixCreateFromMat(data.as_ptr(), nrow, ncol, missing, out)
    }

    unsafe fn dmatrix_free(&self, handle: DMatrixHandle) -> c_int {
        sys::XGDMatrixFree(handle)
    }

    unsafe fn dmatrix_set_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        array: &[f32],
    ) -> c_int {
        sys::XGDMatrixSetFloatInfo(handle, field.as_ptr(), array.as_ptr(), array.len() as bst_ulong)
    }

    unsafe fn dmatrix_get_float_info(
        &self,
        handle: DMatrixHandle,
        field: &CStr,
        out_len: &mut bst_ulong,
        out_dptr: &mut *const f32,
    ) -> c_int {
        sys::XGDMatrixGetFloatInfo(handle, field.as_ptr(), out_len, out_dptr)
    }

    unsafe fn booster_create(&self, dmats: &[DMatrixHandle], out: &mut BoosterHandle) -> c_int {
        sys::XGBoosterCreate(dmats.as_ptr(), dmats.len() as bst_ulong, out)
    }

    unsafe fn booster_free(&self, handle: BoosterHandle) -> c_int {
        sys::XGBoosterFree(handle)
    }

    unsafe fn booster_set_param(
        &self,
        handle: BoosterHandle,
        name: &CStr,
        value: &CStr,
    ) -> c_int {
        sys::XGBoosterSetParam(handle, name.as_ptr(), value.as_ptr())
    }

    unsafe fn booster_update_one_iter(
        &self,
        handle: BoosterHandle,
        iter: c_int,
        dtrain: DMatrixHandle,
    ) -> c_int {
        sys::XGBoosterUpdateOneIter(handle, iter, dtrain)
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
        // training = 0: inference mode, no dropout for dart.
        sys::XGBoosterPredict(handle, dmat, option_mask, ntree_limit, 0, out_len, out_result)
    }
}
