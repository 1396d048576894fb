//! Typed learner parameters.
//!
//! Every recognized key is a field of [`BoosterParams`], so a missing key is a
//! compile error rather than a failed lookup. Values reach the native side as
//! strings produced by [`ParamValue`]'s `Display`, which never depends on the
//! host locale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single parameter value before stringification.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            // Shortest representation that parses back to the same f32, always '.'.
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Booster family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoosterType {
    Gbtree,
    Gblinear,
    Dart,
}

impl BoosterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoosterType::Gbtree => "gbtree",
            BoosterType::Gblinear => "gblinear",
            BoosterType::Dart => "dart",
        }
    }
}

/// Tree construction algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeMethod {
    Auto,
    Exact,
    Approx,
    Hist,
    GpuHist,
}

impl TreeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeMethod::Auto => "auto",
            TreeMethod::Exact => "exact",
            TreeMethod::Approx => "approx",
            TreeMethod::Hist => "hist",
            TreeMethod::GpuHist => "gpu_hist",
        }
    }
}

/// Dropout sampling for the dart booster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Uniform,
    Weighted,
}

impl SampleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::Uniform => "uniform",
            SampleType::Weighted => "weighted",
        }
    }
}

/// Weight normalization for the dart booster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeType {
    Tree,
    Forest,
}

impl NormalizeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizeType::Tree => "tree",
            NormalizeType::Forest => "forest",
        }
    }
}

/// Complete parameter set sent to a learner before its first round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    pub max_depth: u32,
    pub learning_rate: f32,
    /// Number of boosting rounds the learner runs.
    pub n_estimators: u32,
    pub silent: bool,
    pub objective: String,
    pub booster: BoosterType,
    pub tree_method: TreeMethod,
    /// `-1` lets the library pick.
    pub nthread: i32,
    pub gamma: f32,
    pub min_child_weight: u32,
    pub max_delta_step: u32,
    pub subsample: f32,
    pub colsample_bytree: f32,
    pub colsample_bylevel: f32,
    pub reg_alpha: f32,
    pub reg_lambda: f32,
    pub scale_pos_weight: f32,
    pub base_score: f32,
    pub seed: i64,
    #[serde(with = "nan_as_null")]
    pub missing: f32,
    pub sample_type: SampleType,
    pub normalize_type: NormalizeType,
    pub rate_drop: f32,
    pub one_drop: u32,
    pub skip_drop: f32,
    pub num_class: u32,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            learning_rate: 0.1,
            n_estimators: 100,
            silent: true,
            objective: "reg:squarederror".to_string(),
            booster: BoosterType::Gbtree,
            tree_method: TreeMethod::Auto,
            nthread: -1,
            gamma: 0.0,
            min_child_weight: 1,
            max_delta_step: 0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            colsample_bylevel: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            scale_pos_weight: 1.0,
            base_score: 0.5,
            seed: 0,
            missing: f32::NAN,
            sample_type: SampleType::Uniform,
            normalize_type: NormalizeType::Tree,
            rate_drop: 0.0,
            one_drop: 0,
            skip_drop: 0.0,
            num_class: 1,
        }
    }
}

impl BoosterParams {
    /// Number of boosting rounds to run.
    pub fn num_boost_round(&self) -> u32 {
        self.n_estimators
    }

    /// Every key with its value, in a fixed order.
    pub fn to_pairs(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("max_depth", self.max_depth.into()),
            ("learning_rate", self.learning_rate.into()),
            ("n_estimators", self.n_estimators.into()),
            ("silent", self.silent.into()),
            ("objective", self.objective.as_str().into()),
            ("booster", self.booster.as_str().into()),
            ("tree_method", self.tree_method.as_str().into()),
            ("nthread", self.nthread.into()),
            ("gamma", self.gamma.into()),
            ("min_child_weight", self.min_child_weight.into()),
            ("max_delta_step", self.max_delta_step.into()),
            ("subsample", self.subsample.into()),
            ("colsample_bytree", self.colsample_bytree.into()),
            ("colsample_bylevel", self.colsample_bylevel.into()),
            ("reg_alpha", self.reg_alpha.into()),
            ("reg_lambda", self.reg_lambda.into()),
            ("scale_pos_weight", self.scale_pos_weight.into()),
            ("base_score", self.base_score.into()),
            ("seed", self.seed.into()),
            ("missing", self.missing.into()),
            ("sample_type", self.sample_type.as_str().into()),
            ("normalize_type", self.normalize_type.as_str().into()),
            ("rate_drop", self.rate_drop.into()),
            ("one_drop", self.one_drop.into()),
            ("skip_drop", self.skip_drop.into()),
            ("num_class", self.num_class.into()),
        ]
    }
}

/// JSON has no NaN; `missing` round-trips through `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn floats_use_invariant_decimal_point() {
        assert_eq!(ParamValue::from(0.1f32).to_string(), "0.1");
        assert_eq!(ParamValue::from(1.0f32).to_string(), "1");
        assert_eq!(ParamValue::from(0.75f32).to_string(), "0.75");
        assert_eq!(ParamValue::from(f32::NAN).to_string(), "NaN");
    }

    #[test]
    fn bools_and_ints_stringify() {
        assert_eq!(ParamValue::from(true).to_string(), "1");
        assert_eq!(ParamValue::from(false).to_string(), "0");
        assert_eq!(ParamValue::from(-1i32).to_string(), "-1");
        assert_eq!(ParamValue::from("reg:squarederror").to_string(), "reg:squarederror");
    }

    #[test]
    fn every_key_is_present_once() {
        let pairs = BoosterParams::default().to_pairs();
        let keys: HashSet<&str> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), pairs.len());
        assert_eq!(pairs.len(), 26);
        for key in ["max_depth", "learning_rate", "n_estimators", "seed", "missing", "num_class"] {
            assert!(keys.contains(key), "missing {key}");
        }
        assert!(keys.iter().all(|k| k.trim() == *k));
    }

    #[test]
    fn defaults_match_benchmark_learner() {
        let params = BoosterParams::default();
        assert_eq!(params.max_depth, 3);
        assert_eq!(params.num_boost_round(), 100);
        assert_eq!(params.booster, BoosterType::Gbtree);
        assert!(params.missing.is_nan());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: BoosterParams =
            serde_json::from_str(r#"{"n_estimators": 5, "tree_method": "gpu_hist"}"#).unwrap();
        assert_eq!(params.n_estimators, 5);
        assert_eq!(params.tree_method, TreeMethod::GpuHist);
        assert_eq!(params.max_depth, 3);
        assert!(params.missing.is_nan());

        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains(r#""missing":null"#));
    }
}
