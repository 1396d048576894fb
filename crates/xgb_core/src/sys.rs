//! Raw declarations for the XGBoost C API.
//!
//! Every function returns `0` on success and `-1` on failure; the message for
//! the most recent failure on the calling thread is available from
//! `XGBGetLastError`.

#![allow(non_snake_case, non_camel_case_types)]

use libc::c_void;
#[cfg(feature = "native")]
use libc::{c_char, c_float, c_int, c_uint};

/// Opaque handle to a native data matrix
pub type DMatrixHandle = *mut c_void;

/// Opaque handle to a native learner
pub type BoosterHandle = *mut c_void;

/// Unsigned length type used across the C API
pub type bst_ulong = u64;

#[cfg(feature = "native")]
#[link(name = "xgboost")]
extern "C" {
    pub fn XGBGetLastError() -> *const c_char;

    pub fn XGDMatrixCreateFromMat(
        data: *const c_float,
        nrow: bst_ulong,
        ncol: bst_ulong,
        missing: c_float,
        out: *mut DMatrixHandle,
    ) -> c_int;

    pub fn XGDMatrixFree(handle: DMatrixHandle) -> c_int;

    pub fn XGDMatrixSetFloatInfo(
        handle: DMatrixHandle,
        field: *const c_char,
        array: *const c_float,
        len: bst_ulong,
    ) -> c_int;

    pub fn XGDMatrixGetFloatInfo(
        handle: DMatrixHandle,
        field: *const c_char,
        out_len: *mut bst_ulong,
        out_dptr: *mut *const c_float,
    ) -> c_int;

    pub fn XGBoosterCreate(
        dmats: *const DMatrixHandle,
        len: bst_ulong,
        out: *mut BoosterHandle,
    ) -> c_int;

    pub fn XGBoosterFree(handle: BoosterHandle) -> c_int;

    pub fn XGBoosterSetParam(
        handle: BoosterHandle,
        name: *const c_char,
        value: *const c_char,
    ) -> c_int;

    pub fn XGBoosterUpdateOneIter(
        handle: BoosterHandle,
        iter: c_int,
        dtrain: DMatrixHandle,
    ) -> c_int;

    pub fn XGBoosterPredict(
        handle: BoosterHandle,
        dmat: DMatrixHandle,
        option_mask: c_int,
        ntree_limit: c_uint,
        training: c_int,
        out_len: *mut bst_ulong,
        out_result: *mut *const c_float,
    ) -> c_int;
}
