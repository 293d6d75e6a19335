//! Property tests for the tensor algebra.
//!
//! Random tensors are compared against their `sample`-based semantics:
//! whatever the buffer layout does internally, the step-function a
//! tensor denotes must behave like pointwise arithmetic.

use proptest::prelude::*;

use gamboost::SparseTensor;

/// A random strictly-increasing split subset of `(0, bins)`.
fn splits_in(bins: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<bool>(), bins - 1).prop_map(|mask| {
        mask.into_iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then(|| (i + 1) as u32))
            .collect()
    })
}

/// Splits plus one score per slice.
fn tensor_1d_parts(bins: usize) -> impl Strategy<Value = (Vec<u32>, Vec<f64>)> {
    splits_in(bins).prop_flat_map(|splits| {
        let n_slices = splits.len() + 1;
        (
            Just(splits),
            prop::collection::vec(-100.0..100.0f64, n_slices),
        )
    })
}

/// Splits for two dimensions plus one score per grid cell.
fn tensor_2d_parts(
    bins_x: usize,
    bins_y: usize,
) -> impl Strategy<Value = (Vec<u32>, Vec<u32>, Vec<f64>)> {
    (splits_in(bins_x), splits_in(bins_y)).prop_flat_map(|(sx, sy)| {
        let n_cells = (sx.len() + 1) * (sy.len() + 1);
        (
            Just(sx),
            Just(sy),
            prop::collection::vec(-100.0..100.0f64, n_cells),
        )
    })
}

fn build_1d(splits: &[u32], scores: &[f64]) -> SparseTensor {
    let mut t = SparseTensor::new(1, 1).unwrap();
    t.set_splits(0, splits).unwrap();
    t.scores_mut().copy_from_slice(scores);
    t
}

fn build_2d(splits_x: &[u32], splits_y: &[u32], scores: &[f64]) -> SparseTensor {
    let mut t = SparseTensor::new(2, 1).unwrap();
    t.set_splits(0, splits_x).unwrap();
    t.set_splits(1, splits_y).unwrap();
    t.scores_mut().copy_from_slice(scores);
    t
}

const BINS_X: usize = 7;
const BINS_Y: usize = 5;

proptest! {
    #[test]
    fn add_matches_pointwise_sum_1d(
        (splits_a, scores_a) in tensor_1d_parts(BINS_X),
        (splits_b, scores_b) in tensor_1d_parts(BINS_X),
    ) {
        let a = build_1d(&splits_a, &scores_a);
        let b = build_1d(&splits_b, &scores_b);
        let mut sum = a.clone();
        sum.add(&b).unwrap();
        for bin in 0..BINS_X {
            prop_assert_eq!(
                sum.sample(&[bin])[0],
                a.sample(&[bin])[0] + b.sample(&[bin])[0]
            );
        }
        // the merged partition stays strictly increasing
        prop_assert!(sum.splits(0).windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn add_matches_pointwise_sum_2d(
        (sx_a, sy_a, scores_a) in tensor_2d_parts(BINS_X, BINS_Y),
        (sx_b, sy_b, scores_b) in tensor_2d_parts(BINS_X, BINS_Y),
    ) {
        let a = build_2d(&sx_a, &sy_a, &scores_a);
        let b = build_2d(&sx_b, &sy_b, &scores_b);
        let mut sum = a.clone();
        sum.add(&b).unwrap();
        for x in 0..BINS_X {
            for y in 0..BINS_Y {
                prop_assert_eq!(
                    sum.sample(&[x, y])[0],
                    a.sample(&[x, y])[0] + b.sample(&[x, y])[0]
                );
            }
        }
    }

    #[test]
    fn expand_preserves_sampled_scores(
        (sx, sy, scores) in tensor_2d_parts(BINS_X, BINS_Y),
    ) {
        let t = build_2d(&sx, &sy, &scores);
        let mut dense = t.clone();
        dense.expand(&[BINS_X, BINS_Y]).unwrap();
        prop_assert!(dense.is_expanded());
        prop_assert_eq!(dense.slice_count(0), BINS_X);
        prop_assert_eq!(dense.slice_count(1), BINS_Y);
        for x in 0..BINS_X {
            for y in 0..BINS_Y {
                prop_assert_eq!(dense.sample(&[x, y])[0], t.sample(&[x, y])[0]);
            }
        }
        // expanding again is a no-op
        let snapshot = dense.clone();
        dense.expand(&[BINS_X, BINS_Y]).unwrap();
        prop_assert!(dense.is_equal(&snapshot));
    }

    #[test]
    fn multiply_scales_every_cell(
        (splits, scores) in tensor_1d_parts(BINS_X),
        factor in -8.0..8.0f64,
    ) {
        let t = build_1d(&splits, &scores);
        let mut scaled = t.clone();
        let bad = scaled.multiply_and_check(factor);
        prop_assert!(!bad);
        for bin in 0..BINS_X {
            prop_assert_eq!(scaled.sample(&[bin])[0], t.sample(&[bin])[0] * factor);
        }
    }

    #[test]
    fn copy_then_is_equal(
        (sx, sy, scores) in tensor_2d_parts(BINS_X, BINS_Y),
    ) {
        let src = build_2d(&sx, &sy, &scores);
        let mut dst = SparseTensor::new(2, 1).unwrap();
        dst.copy_from(&src).unwrap();
        prop_assert!(dst.is_equal(&src));
    }

    #[test]
    fn add_then_expand_equals_expand_then_clamped_add(
        (sx_a, sy_a, scores_a) in tensor_2d_parts(BINS_X, BINS_Y),
        (sx_b, sy_b, scores_b) in tensor_2d_parts(BINS_X, BINS_Y),
    ) {
        // the two routes boosting takes to accumulate an update must
        // agree on finite inputs
        let a = build_2d(&sx_a, &sy_a, &scores_a);
        let b = build_2d(&sx_b, &sy_b, &scores_b);

        let mut merged = a.clone();
        merged.add(&b).unwrap();
        merged.expand(&[BINS_X, BINS_Y]).unwrap();

        let mut dense = a.clone();
        dense.expand(&[BINS_X, BINS_Y]).unwrap();
        let mut update = b.clone();
        update.expand(&[BINS_X, BINS_Y]).unwrap();
        dense.add_expanded_clamped(update.scores());

        for x in 0..BINS_X {
            for y in 0..BINS_Y {
                prop_assert_eq!(dense.sample(&[x, y])[0], merged.sample(&[x, y])[0]);
            }
        }
    }
}
