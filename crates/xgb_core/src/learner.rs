//! Train-once, predict-many wrapper over [`DMatrix`] and [`Booster`].

use std::sync::Arc;

use crate::api::XgbApi;
use crate::booster::Booster;
use crate::dmatrix::DMatrix;
use crate::errors::{Result, XgbError};
use crate::params::BoosterParams;

/// Scores strictly above this value are labelled `1.0`.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Map raw scores to binary class labels: `1.0` iff `score > cutoff`.
pub fn threshold_labels(scores: &[f32], cutoff: f32) -> Vec<f32> {
    scores
        .iter()
        .map(|&score| if score > cutoff { 1.0 } else { 0.0 })
        .collect()
}

/// Binary classifier driven through the native learner.
///
/// Scoped matrices built for training and inference are freed on every exit
/// path; the trained learner lives until the `Learner` is released or dropped.
pub struct Learner {
    api: Arc<dyn XgbApi>,
    params: BoosterParams,
    booster: Option<Booster>,
}

impl Learner {
    pub fn new(api: Arc<dyn XgbApi>, params: BoosterParams) -> Self {
        Self {
            api,
            params,
            booster: None,
        }
    }

    pub fn with_defaults(api: Arc<dyn XgbApi>) -> Self {
        Self::new(api, BoosterParams::default())
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.booster.is_some()
    }

    /// Train for `n_estimators` rounds. May be called once per learner.
    pub fn train<R: AsRef<[f32]>>(&mut self, rows: &[R], labels: &[f32]) -> Result<()> {
        if self.booster.is_some() {
            return Err(XgbError::usage("learner is already trained"));
        }
        let rounds = i32::try_from(self.params.num_boost_round()).map_err(|_| {
            XgbError::usage(format!(
                "n_estimators {} exceeds the native round index range",
                self.params.num_boost_round()
            ))
        })?;

        let mut dtrain = DMatrix::with_labels(Arc::clone(&self.api), rows, labels)?;
        let mut booster = Booster::new(&self.params, &dtrain)?;
        for round in 0..rounds {
            booster.advance(&dtrain, round)?;
        }
        dtrain.release()?;

        tracing::debug!(rows = rows.len(), rounds, "training complete");
        self.booster = Some(booster);
        Ok(())
    }

    /// Raw model scores for `rows`.
    pub fn predict_scores<R: AsRef<[f32]>>(&self, rows: &[R]) -> Result<Vec<f32>> {
        let booster = self
            .booster
            .as_ref()
            .ok_or_else(|| XgbError::usage("predict called before train"))?;
        if booster.is_released() {
            return Err(XgbError::usage("predict called after release"));
        }

        let mut dtest = DMatrix::new(Arc::clone(&self.api), rows)?;
        let scores = booster.predict(&dtest)?;
        dtest.release()?;
        Ok(scores)
    }

    /// Binary class labels for `rows`, thresholded at [`DECISION_THRESHOLD`].
    pub fn predict<R: AsRef<[f32]>>(&self, rows: &[R]) -> Result<Vec<f32>> {
        let scores = self.predict_scores(rows)?;
        Ok(threshold_labels(&scores, DECISION_THRESHOLD))
    }

    /// Free the trained learner, if any. The learner cannot be retrained.
    pub fn release(&mut self) -> Result<()> {
        match self.booster.as_mut() {
            Some(booster) => booster.release(),
            None => Ok(()),
        }
    }
}
