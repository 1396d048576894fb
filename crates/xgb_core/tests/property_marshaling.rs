use proptest::prelude::*;
use xgbench_core::dataset::{from_snapshot_bytes, to_snapshot_bytes, CachedDataset};
use xgbench_core::{flatten, threshold_labels, unflatten, ParamValue};

fn dense_rows() -> impl Strategy<Value = Vec<Vec<f32>>> {
    (1usize..8, 1usize..12).prop_flat_map(|(cols, rows)| {
        prop::collection::vec(prop::collection::vec(any::<f32>(), cols), rows)
    })
}

fn bits(rows: &[Vec<f32>]) -> Vec<Vec<u32>> {
    rows.iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect())
        .collect()
}

proptest! {
    #[test]
    fn flatten_keeps_row_major_order(rows in dense_rows()) {
        let (flat, num_rows, num_cols) = flatten(&rows).unwrap();
        prop_assert_eq!(num_rows, rows.len());
        prop_assert_eq!(num_cols, rows[0].len());
        prop_assert_eq!(flat.len(), num_rows * num_cols);
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                prop_assert_eq!(flat[r * num_cols + c].to_bits(), value.to_bits());
            }
        }

        let back = unflatten(&flat, num_rows, num_cols).unwrap();
        prop_assert_eq!(bits(&back), bits(&rows));
    }

    #[test]
    fn ragged_rows_never_flatten(rows in dense_rows(), extra in 1usize..4) {
        let mut rows = rows;
        let last = rows.len() - 1;
        rows[last].extend(std::iter::repeat(0.0).take(extra));
        let single_row = rows.len() == 1;
        prop_assert_eq!(flatten(&rows).is_err(), !single_row);
    }

    #[test]
    fn float_params_use_a_decimal_point(value in any::<f32>().prop_filter("finite", |v| v.is_finite())) {
        let text = ParamValue::from(value).to_string();
        prop_assert!(!text.contains(','));
        prop_assert_eq!(text.parse::<f32>().unwrap().to_bits(), value.to_bits());
    }

    #[test]
    fn thresholded_labels_are_binary(scores in prop::collection::vec(any::<f32>(), 0..64), cutoff in -10.0f32..10.0) {
        let labels = threshold_labels(&scores, cutoff);
        prop_assert_eq!(labels.len(), scores.len());
        for (label, score) in labels.iter().zip(&scores) {
            prop_assert!(*label == 0.0 || *label == 1.0);
            prop_assert_eq!(*label == 1.0, *score > cutoff);
        }
    }

    #[test]
    fn snapshots_are_bit_identical(rows in dense_rows(), test_rows in prop::option::of(dense_rows())) {
        let labels = (0..rows.len()).map(|i| i as f32 - 0.5).collect();
        let dataset = CachedDataset {
            train_data: rows,
            labels,
            test_labels: test_rows.as_ref().map(|t| vec![f32::NAN; t.len()]),
            test_data: test_rows,
        };
        let back = from_snapshot_bytes(&to_snapshot_bytes(&dataset).unwrap()).unwrap();
        prop_assert!(dataset.bitwise_eq(&back));
    }
}
