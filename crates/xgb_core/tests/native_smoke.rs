//! Runs only when built with `--features native` against a real libxgboost.
#![cfg(feature = "native")]

use xgbench_core::{BoosterParams, DMatrix, Learner, NativeApi, XgbError};

#[test]
fn native_learner_trains_and_predicts() {
    let rows = vec![
        vec![0.0, 1.0, 3.0],
        vec![1.0, 0.0, 2.0],
        vec![0.1, 1.0, 3.1],
        vec![0.9, 0.0, 1.9],
    ];
    let params = BoosterParams {
        n_estimators: 5,
        ..BoosterParams::default()
    };
    let mut learner = Learner::new(NativeApi::shared(), params);
    learner.train(&rows, &[0.0, 1.0, 0.0, 1.0]).unwrap();

    let labels = learner.predict(&rows).unwrap();
    assert_eq!(labels.len(), 4);
    assert!(labels.iter().all(|v| *v == 0.0 || *v == 1.0));
    learner.release().unwrap();
}

#[test]
fn native_labels_round_trip() {
    let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
    let dmat = DMatrix::with_labels(NativeApi::shared(), &rows, &[0.25, 0.75]).unwrap();
    assert_eq!(dmat.get_float_info("label").unwrap(), vec![0.25, 0.75]);
}

#[test]
fn native_rejects_unknown_field() {
    let rows = vec![vec![1.0, 2.0]];
    let mut dmat = DMatrix::new(NativeApi::shared(), &rows).unwrap();
    let err = dmat.set_float_info("no_such_field", &[1.0]).unwrap_err();
    assert!(matches!(err, XgbError::NativeCall { .. }));
}
