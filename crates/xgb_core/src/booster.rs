//! Model handle
//!
//! [`Booster`] owns one native learner created against a training matrix. It
//! pushes the full parameter set before the first round, advances training one
//! round at a time, and decodes the library's prediction buffer into an owned
//! vector.

use libc::{c_int, c_uint};
use std::ffi::CString;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::Arc;

use crate::api::{decode_f32_buffer, entry, xgb_call, XgbApi};
use crate::dmatrix::DMatrix;
use crate::errors::{Result, XgbError};
use crate::params::{BoosterParams, ParamValue};
use crate::sys::{bst_ulong, BoosterHandle};

/// Bits of the prediction option mask.
pub mod predict_option {
    /// Transformed prediction value
    pub const NORMAL: i32 = 0x00;
    /// Raw margin instead of the transformed value
    pub const OUTPUT_MARGIN: i32 = 0x01;
    /// Leaf index per tree
    pub const PREDICT_LEAF: i32 = 0x02;
    /// Feature contributions
    pub const PREDICT_CONTRIBUTIONS: i32 = 0x04;
}

/// Owned native learner.
pub struct Booster {
    api: Arc<dyn XgbApi>,
    handle: BoosterHandle,
    released: bool,
}

impl Booster {
    /// Create a learner bound to `dtrain` and apply every parameter.
    ///
    /// If any parameter is rejected the learner is freed before the error is
    /// returned.
    pub fn new(params: &BoosterParams, dtrain: &DMatrix) -> Result<Self> {
        let api = Arc::clone(dtrain.api());
        let cached = [dtrain.handle()?];

        let mut handle = ptr::null_mut();
        xgb_call!(
            api,
            entry::BOOSTER_CREATE,
            api.booster_create(&cached, &mut handle)
        )?;
        tracing::debug!("created Booster");

        let mut booster = Booster {
            api,
            handle,
            released: false,
        };
        for (name, value) in params.to_pairs() {
            booster.set_param(name, &value)?;
        }
        Ok(booster)
    }

    /// Set one named parameter, stringified with [`ParamValue`]'s `Display`.
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let handle = self.handle()?;
        let c_name = CString::new(name)
            .map_err(|_| XgbError::usage(format!("parameter name {name:?} contains NUL")))?;
        let c_value = CString::new(value.to_string())
            .map_err(|_| XgbError::usage(format!("value for {name} contains NUL")))?;
        tracing::trace!(param = name, value = %value, "setting parameter");
        xgb_call!(
            self.api,
            entry::BOOSTER_SET_PARAM,
            self.api.booster_set_param(handle, &c_name, &c_value)
        )
    }

    /// Run one boosting round on `dtrain`.
    ///
    /// `round` is passed through as given; callers count up from zero.
    pub fn advance(&mut self, dtrain: &DMatrix, round: i32) -> Result<()> {
        let handle = self.handle()?;
        let dmat = dtrain.handle()?;
        xgb_call!(
            self.api,
            entry::BOOSTER_UPDATE_ONE_ITER,
            self.api.booster_update_one_iter(handle, round, dmat)
        )?;
        tracing::trace!(round, "boosting round complete");
        Ok(())
    }

    /// Plain predicted values using every tree trained so far.
    pub fn predict(&self, dmat: &DMatrix) -> Result<Vec<f32>> {
        self.predict_with(dmat, predict_option::NORMAL, 0)
    }

    /// Predict with an explicit option mask and tree limit (`0` = all trees).
    pub fn predict_with(&self, dmat: &DMatrix, option_mask: i32, tree_limit: u32) -> Result<Vec<f32>> {
        let handle = self.handle()?;
        let data = dmat.handle()?;
        let mut len: bst_ulong = 0;
        let mut out = ptr::null();
        xgb_call!(
            self.api,
            entry::BOOSTER_PREDICT,
            self.api.booster_predict(
                handle,
                data,
                option_mask as c_int,
                tree_limit as c_uint,
                &mut len,
                &mut out,
            )
        )?;
        // SAFETY: the buffer is owned by this learner and stays valid until the
        // next call on it; it is copied out before `&self` is released.
        unsafe { decode_f32_buffer(entry::BOOSTER_PREDICT, out, len) }
    }

    /// The native handle, or a usage error once released.
    pub fn handle(&self) -> Result<BoosterHandle> {
        if self.released {
            return Err(XgbError::usage("Booster used after release"));
        }
        Ok(self.handle)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Free the native learner. Later calls are no-ops.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let handle = mem::replace(&mut self.handle, ptr::null_mut());
        xgb_call!(self.api, entry::BOOSTER_FREE, self.api.booster_free(handle))?;
        tracing::debug!("freed Booster");
        Ok(())
    }
}

impl Drop for Booster {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "failed to free Booster on drop");
        }
    }
}

impl fmt::Debug for Booster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Booster")
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}
