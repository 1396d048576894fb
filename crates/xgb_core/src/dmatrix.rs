//! Dataset handle
//!
//! [`DMatrix`] owns exactly one native data matrix. It validates the shape of
//! row-major input before any native call, flattens it into the contiguous
//! buffer the library expects, and frees the handle exactly once: explicitly
//! through [`DMatrix::release`] or implicitly on drop.

use std::ffi::CString;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::Arc;

use crate::api::{decode_f32_buffer, entry, xgb_call, XgbApi};
use crate::errors::{Result, XgbError};
use crate::sys::{bst_ulong, DMatrixHandle};

/// Missing-value sentinel used when building matrices from dense rows.
pub const DEFAULT_MISSING: f32 = -1.0;

/// Flatten rows into one row-major buffer, returning `(buffer, rows, cols)`.
///
/// Fails with [`XgbError::Shape`] on an empty matrix, zero-width rows or
/// ragged rows.
pub fn flatten<R: AsRef<[f32]>>(rows: &[R]) -> Result<(Vec<f32>, usize, usize)> {
    let first = rows
        .first()
        .ok_or_else(|| XgbError::shape("matrix has no rows"))?;
    let num_cols = first.as_ref().len();
    if num_cols == 0 {
        return Err(XgbError::shape("matrix has no columns"));
    }

    let mut flat = Vec::with_capacity(rows.len() * num_cols);
    for (idx, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != num_cols {
            return Err(XgbError::shape(format!(
                "row {idx} has {} columns, expected {num_cols}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }

    Ok((flat, rows.len(), num_cols))
}

/// Inverse of [`flatten`].
pub fn unflatten(flat: &[f32], num_rows: usize, num_cols: usize) -> Result<Vec<Vec<f32>>> {
    if num_rows.checked_mul(num_cols) != Some(flat.len()) {
        return Err(XgbError::shape(format!(
            "buffer of {} values cannot be viewed as {num_rows} x {num_cols}",
            flat.len()
        )));
    }
    if num_cols == 0 {
        return Ok(vec![Vec::new(); num_rows]);
    }
    Ok(flat.chunks_exact(num_cols).map(<[f32]>::to_vec).collect())
}

/// Owned native data matrix.
pub struct DMatrix {
    api: Arc<dyn XgbApi>,
    handle: DMatrixHandle,
    num_rows: usize,
    num_cols: usize,
    released: bool,
}

impl DMatrix {
    /// Unlabeled matrix, for inference.
    pub fn new<R: AsRef<[f32]>>(api: Arc<dyn XgbApi>, rows: &[R]) -> Result<Self> {
        Self::from_dense(api, rows, None, DEFAULT_MISSING)
    }

    /// Matrix with its `label` field attached, for training.
    pub fn with_labels<R: AsRef<[f32]>>(
        api: Arc<dyn XgbApi>,
        rows: &[R],
        labels: &[f32],
    ) -> Result<Self> {
        Self::from_dense(api, rows, Some(labels), DEFAULT_MISSING)
    }

    /// Build a matrix from dense rows.
    ///
    /// Shape and label count are checked before the library is touched. If
    /// attaching labels fails, the freshly created handle is freed before the
    /// error is returned.
    pub fn from_dense<R: AsRef<[f32]>>(
        api: Arc<dyn XgbApi>,
        rows: &[R],
        labels: Option<&[f32]>,
        missing: f32,
    ) -> Result<Self> {
        let (flat, num_rows, num_cols) = flatten(rows)?;
        if let Some(labels) = labels {
            if labels.len() != num_rows {
                return Err(XgbError::shape(format!(
                    "{} labels for {num_rows} rows",
                    labels.len()
                )));
            }
        }

        let mut handle = ptr::null_mut();
        xgb_call!(
            api,
            entry::DMATRIX_CREATE_FROM_MAT,
            api.dmatrix_create_from_mat(
                &flat,
                num_rows as bst_ulong,
                num_cols as bst_ulong,
                missing,
                &mut handle,
            )
        )?;
        tracing::debug!(rows = num_rows, cols = num_cols, "created DMatrix");

        let mut dmat = DMatrix {
            api,
            handle,
            num_rows,
            num_cols,
            released: false,
        };
        if let Some(labels) = labels {
            dmat.set_float_info("label", labels)?;
        }
        Ok(dmat)
    }

    /// Attach a named per-row float field such as `label` or `weight`.
    pub fn set_float_info(&mut self, field: &str, values: &[f32]) -> Result<()> {
        if values.is_empty() {
            return Err(XgbError::shape(format!("no values given for field `{field}`")));
        }
        let handle = self.handle()?;
        let name = field_name(field)?;
        xgb_call!(
            self.api,
            entry::DMATRIX_SET_FLOAT_INFO,
            self.api.dmatrix_set_float_info(handle, &name, values)
        )
    }

    /// Read back a float field. An unset field yields an empty vector.
    pub fn get_float_info(&self, field: &str) -> Result<Vec<f32>> {
        let handle = self.handle()?;
        let name = field_name(field)?;
        let mut len: bst_ulong = 0;
        let mut out = ptr::null();
        xgb_call!(
            self.api,
            entry::DMATRIX_GET_FLOAT_INFO,
            self.api.dmatrix_get_float_info(handle, &name, &mut len, &mut out)
        )?;
        // SAFETY: on success the library points `out` at `len` floats it owns,
        // valid until the matrix is modified or freed; we hold `&self`.
        unsafe { decode_f32_buffer(entry::DMATRIX_GET_FLOAT_INFO, out, len) }
    }

    /// The native handle, or a usage error once released.
    pub fn handle(&self) -> Result<DMatrixHandle> {
        if self.released {
            return Err(XgbError::usage("DMatrix used after release"));
        }
        Ok(self.handle)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn api(&self) -> &Arc<dyn XgbApi> {
        &self.api
    }

    /// Free the native matrix. Later calls are no-ops.
    ///
    /// The handle is considered gone even when the library reports a failure,
    /// so it is never freed twice.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let handle = mem::replace(&mut self.handle, ptr::null_mut());
        xgb_call!(self.api, entry::DMATRIX_FREE, self.api.dmatrix_free(handle))?;
        tracing::debug!(rows = self.num_rows, "freed DMatrix");
        Ok(())
    }
}

impl Drop for DMatrix {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "failed to free DMatrix on drop");
        }
    }
}

impl fmt::Debug for DMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DMatrix")
            .field("handle", &self.handle)
            .field("num_rows", &self.num_rows)
            .field("num_cols", &self.num_cols)
            .field("released", &self.released)
            .finish()
    }
}

fn field_name(field: &str) -> Result<CString> {
    CString::new(field).map_err(|_| XgbError::usage(format!("field name {field:?} contains NUL")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedApi;

    fn sample_rows() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ]
    }

    #[test]
    fn flatten_is_row_major() {
        let (flat, rows, cols) = flatten(&sample_rows()).unwrap();
        assert_eq!((rows, cols), (3, 3));
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(unflatten(&flat, rows, cols).unwrap(), sample_rows());
    }

    #[test]
    fn flatten_rejects_bad_shapes() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(matches!(flatten(&empty), Err(XgbError::Shape(_))));
        assert!(matches!(flatten(&[Vec::<f32>::new()]), Err(XgbError::Shape(_))));

        let ragged = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]];
        let err = flatten(&ragged).unwrap_err();
        assert!(err.to_string().contains("row 1 has 3 columns"));
    }

    #[test]
    fn unflatten_checks_length() {
        assert!(matches!(unflatten(&[1.0, 2.0, 3.0], 2, 2), Err(XgbError::Shape(_))));
    }

    #[test]
    fn buffer_reaches_library_in_row_major_order() {
        let api = SimulatedApi::shared();
        let dmat = DMatrix::new(api.clone(), &sample_rows()).unwrap();
        let (data, rows, cols) = api.matrix_data(dmat.handle().unwrap()).unwrap();
        assert_eq!((rows, cols), (3, 3));
        assert_eq!(data, flatten(&sample_rows()).unwrap().0);
    }

    #[test]
    fn labels_are_attached_and_readable() {
        let api = SimulatedApi::shared();
        let dmat = DMatrix::with_labels(api.clone(), &sample_rows(), &[0.0, 1.0, 0.5]).unwrap();
        assert_eq!(dmat.get_float_info("label").unwrap(), vec![0.0, 1.0, 0.5]);
        assert!(dmat.get_float_info("weight").unwrap().is_empty());
        assert_eq!(api.call_count(entry::DMATRIX_SET_FLOAT_INFO), 1);
    }

    #[test]
    fn ragged_rows_fail_before_any_native_call() {
        let api = SimulatedApi::shared();
        let ragged = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0], vec![6.0, 7.0]];
        let err = DMatrix::new(api.clone(), &ragged).unwrap_err();
        assert!(matches!(err, XgbError::Shape(_)));
        assert_eq!(api.total_calls(), 0);
    }

    #[test]
    fn label_count_mismatch_fails_before_any_native_call() {
        let api = SimulatedApi::shared();
        let err = DMatrix::with_labels(api.clone(), &sample_rows(), &[1.0]).unwrap_err();
        assert!(matches!(err, XgbError::Shape(_)));
        assert_eq!(api.total_calls(), 0);
    }

    #[test]
    fn empty_float_info_is_rejected() {
        let api = SimulatedApi::shared();
        let mut dmat = DMatrix::new(api, &sample_rows()).unwrap();
        assert!(matches!(dmat.set_float_info("weight", &[]), Err(XgbError::Shape(_))));
    }

    #[test]
    fn create_failure_surfaces_native_message() {
        let api = SimulatedApi::shared();
        api.fail_on(entry::DMATRIX_CREATE_FROM_MAT, "bad allocation");
        let err = DMatrix::new(api.clone(), &sample_rows()).unwrap_err();
        match err {
            XgbError::NativeCall { entry, message } => {
                assert_eq!(entry, "XGDMatrixCreateFromMat");
                assert_eq!(message, "bad allocation");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(api.live_matrices(), 0);
    }

    #[test]
    fn label_failure_frees_the_matrix() {
        let api = SimulatedApi::shared();
        api.fail_on(entry::DMATRIX_SET_FLOAT_INFO, "label rejected");
        let err = DMatrix::with_labels(api.clone(), &sample_rows(), &[1.0, 0.0, 1.0]).unwrap_err();
        assert!(err.is_native());
        assert_eq!(api.live_matrices(), 0);
        assert_eq!(api.call_count(entry::DMATRIX_FREE), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let api = SimulatedApi::shared();
        let mut dmat = DMatrix::new(api.clone(), &sample_rows()).unwrap();
        dmat.release().unwrap();
        dmat.release().unwrap();
        drop(dmat);
        assert_eq!(api.call_count(entry::DMATRIX_FREE), 1);
        assert_eq!(api.live_matrices(), 0);
    }

    #[test]
    fn release_failure_is_reported_once() {
        let api = SimulatedApi::shared();
        let mut dmat = DMatrix::new(api.clone(), &sample_rows()).unwrap();
        api.fail_on(entry::DMATRIX_FREE, "free failed");
        assert!(dmat.release().unwrap_err().is_native());
        assert!(dmat.is_released());
        dmat.release().unwrap();
        drop(dmat);
        assert_eq!(api.call_count(entry::DMATRIX_FREE), 1);
    }

    #[test]
    fn handle_is_unavailable_after_release() {
        let api = SimulatedApi::shared();
        let mut dmat = DMatrix::new(api, &sample_rows()).unwrap();
        dmat.release().unwrap();
        assert!(matches!(dmat.handle(), Err(XgbError::Usage(_))));
        assert!(matches!(dmat.get_float_info("label"), Err(XgbError::Usage(_))));
    }

    #[test]
    fn drop_frees_the_matrix() {
        let api = SimulatedApi::shared();
        {
            let _dmat = DMatrix::new(api.clone(), &sample_rows()).unwrap();
            assert_eq!(api.live_matrices(), 1);
        }
        assert_eq!(api.live_matrices(), 0);
    }
}
