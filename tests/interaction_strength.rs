//! End-to-end interaction scoring tests.
//!
//! These drive the full query pipeline (binning, totals, the cut
//! sweep, normalization) through the public API.

use approx::assert_abs_diff_eq;
use ndarray::{array, Array1, Array2};
use rstest::rstest;

use gamboost::{
    rank_pairs, InteractionDataset, InteractionError, InteractionOptions, InteractionScorer,
    Parallelism, TaskKind, ILLEGAL_GAIN,
};

/// Two features over a 2x3 grid, one sample per cell, cell-major
/// gradients.
fn six_cell_dataset(gradients: [f64; 6], weights: Option<Array1<f64>>) -> InteractionDataset {
    let bins = array![[0u32, 1, 0, 1, 0, 1], [0, 0, 1, 1, 2, 2]];
    let grads = Array2::from_shape_vec((1, 6), gradients.to_vec()).unwrap();
    InteractionDataset::new(TaskKind::Regression, bins, vec![2, 3], grads, None, weights).unwrap()
}

#[test]
fn strength_is_best_gain_over_total_weight() {
    let ds = six_cell_dataset([1.0, 1.0, -1.0, -1.0, 2.0, -2.0], None);
    let mut scorer = InteractionScorer::new(&ds);
    let strength = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    // the winning cut separates y = 2 from the cancelling rows below:
    // quadrant gains 0 + 0 + 2^2/1 + 2^2/1 = 8, over 6 samples
    assert_abs_diff_eq!(strength, 8.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn zero_gradients_score_zero() {
    let ds = six_cell_dataset([0.0; 6], None);
    let mut scorer = InteractionScorer::new(&ds);
    let strength = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    assert_eq!(strength, 0.0);
}

#[test]
fn feature_order_does_not_change_strength() {
    let ds = six_cell_dataset([1.0, 1.0, -1.0, -1.0, 2.0, -2.0], None);
    let mut scorer = InteractionScorer::new(&ds);
    let forward = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    let swapped = scorer
        .evaluate(&[1, 0], InteractionOptions::new(), 1)
        .unwrap();
    assert_abs_diff_eq!(forward, swapped, epsilon = 1e-12);
}

#[test]
fn sample_weights_scale_the_normalizer() {
    let weights = array![2.0, 2.0, 2.0, 2.0, 2.0, 2.0];
    let weighted = six_cell_dataset([1.0, 1.0, -1.0, -1.0, 2.0, -2.0], Some(weights));
    let mut scorer = InteractionScorer::new(&weighted);
    let strength = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    // doubling every weight doubles quadrant weights (halving the raw
    // gain) and doubles the normalizer
    assert_abs_diff_eq!(strength, 8.0 / 2.0 / 12.0, epsilon = 1e-12);
}

#[rstest]
#[case::empty_group(&[], 0.0)]
#[case::one_dimension(&[1], ILLEGAL_GAIN)]
#[case::three_dimensions(&[0, 1, 2], ILLEGAL_GAIN)]
#[case::single_bin_pair(&[0, 3], 0.0)]
#[case::single_bin_in_triple(&[0, 1, 3], 0.0)]
fn boundary_groups(#[case] features: &[usize], #[case] expected: f64) {
    // feature 3 has a single bin, so any group containing it scores
    // zero before the dimension count is even considered
    let bins = array![
        [0u32, 1, 0, 1],
        [0, 0, 1, 1],
        [0, 1, 1, 0],
        [0, 0, 0, 0],
    ];
    let grads = array![[1.0, -1.0, -1.0, 1.0]];
    let ds = InteractionDataset::new(
        TaskKind::Regression,
        bins,
        vec![2, 2, 2, 1],
        grads,
        None,
        None,
    )
    .unwrap();
    let mut scorer = InteractionScorer::new(&ds);
    let strength = scorer
        .evaluate(features, InteractionOptions::new(), 1)
        .unwrap();
    assert_eq!(strength, expected);
}

#[test]
fn invalid_feature_index_is_illegal_param() {
    let ds = six_cell_dataset([1.0; 6], None);
    let mut scorer = InteractionScorer::new(&ds);
    let err = scorer
        .evaluate(&[0, 7], InteractionOptions::new(), 1)
        .unwrap_err();
    assert!(matches!(err, InteractionError::IllegalParam(_)));
}

#[test]
fn zero_sample_dataset_scores_zero() {
    let bins = Array2::<u32>::zeros((2, 0));
    let grads = Array2::<f64>::zeros((1, 0));
    let ds = InteractionDataset::new(TaskKind::Regression, bins, vec![3, 3], grads, None, None)
        .unwrap();
    let mut scorer = InteractionScorer::new(&ds);
    assert_eq!(
        scorer
            .evaluate(&[0, 1], InteractionOptions::new(), 1)
            .unwrap(),
        0.0
    );
}

#[test]
fn multiclass_pair_strength_is_finite_and_nonnegative() {
    // 3 classes over a 2x2 grid, 8 samples
    let bins = array![[0u32, 1, 0, 1, 0, 1, 0, 1], [0, 0, 1, 1, 0, 0, 1, 1]];
    let gradients = array![
        [0.6, -0.3, -0.3, 0.6, 0.1, -0.1, 0.2, -0.2],
        [-0.3, 0.6, -0.3, -0.3, -0.2, 0.3, -0.1, 0.1],
        [-0.3, -0.3, 0.6, -0.3, 0.1, -0.2, -0.1, 0.1],
    ];
    let hessians = gradients.mapv(|g: f64| g.abs() * (1.0 - g.abs()));
    let ds = InteractionDataset::new(
        TaskKind::Classification { n_classes: 3 },
        bins,
        vec![2, 2],
        gradients,
        Some(hessians),
        None,
    )
    .unwrap();
    let mut scorer = InteractionScorer::new(&ds);
    let strength = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    assert!(strength.is_finite());
    assert!(strength >= 0.0);
}

#[test]
fn pure_option_never_exceeds_impure() {
    let ds = six_cell_dataset([2.0, 1.0, -1.0, -1.5, 2.0, -2.0], None);
    let mut scorer = InteractionScorer::new(&ds);
    let impure = scorer
        .evaluate(&[0, 1], InteractionOptions::new(), 1)
        .unwrap();
    let pure = scorer
        .evaluate(&[0, 1], InteractionOptions::new().pure(), 1)
        .unwrap();
    assert!(pure <= impure);
    assert!(pure >= 0.0);
}

#[test]
fn ranked_pairs_end_to_end() {
    // features 0 and 1 interact; feature 2 is noise-free and additive
    let bins = array![
        [0u32, 1, 0, 1, 0, 1, 0, 1],
        [0, 0, 1, 1, 0, 0, 1, 1],
        [0, 0, 0, 0, 1, 1, 1, 1],
    ];
    let gradients = array![[1.0, -1.0, -1.0, 1.0, 1.1, -0.9, -1.1, 0.9]];
    let ds = InteractionDataset::new(
        TaskKind::Regression,
        bins,
        vec![2, 2, 2],
        gradients,
        None,
        None,
    )
    .unwrap();

    let ranked = rank_pairs(&ds, InteractionOptions::new(), 1, Parallelism::Sequential).unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!((ranked[0].feature_a, ranked[0].feature_b), (0, 1));
    assert!(ranked
        .windows(2)
        .all(|w| w[0].strength >= w[1].strength));

    let parallel = rank_pairs(&ds, InteractionOptions::new(), 1, Parallelism::Parallel).unwrap();
    assert_eq!(ranked, parallel);
}

#[test]
fn ranked_pairs_serialize_round_trip() {
    let ds = six_cell_dataset([1.0, 1.0, -1.0, -1.0, 2.0, -2.0], None);
    let ranked = rank_pairs(&ds, InteractionOptions::new(), 1, Parallelism::Sequential).unwrap();
    let json = serde_json::to_string(&ranked).unwrap();
    let back: Vec<gamboost::PairStrength> = serde_json::from_str(&json).unwrap();
    assert_eq!(ranked, back);
}
