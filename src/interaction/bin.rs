//! Binning samples into the interaction histogram.

use super::FeatureGroup;
use crate::data::InteractionDataset;
use crate::histograms::HistogramArena;

/// Fill the arena's main zone with per-cell aggregates.
///
/// Each sample lands in the bucket addressed by its bin-tuple, with
/// dimension 0 carrying the smallest stride. The arena must already be
/// sized and zeroed for this group.
pub(crate) fn bin_interaction(
    arena: &mut HistogramArena,
    group: &FeatureGroup,
    dataset: &InteractionDataset,
) {
    let n_samples = dataset.n_samples();
    let n_scores = dataset.score_count();
    let gradients = dataset.gradients();
    let hessians = dataset.hessians();

    for i in 0..n_samples {
        let mut cell = 0;
        let mut stride = 1;
        for entry in group.entries() {
            let bin = dataset.bin(entry.feature, i) as usize;
            debug_assert!(bin < entry.bin_count);
            cell += bin * stride;
            stride *= entry.bin_count;
        }
        debug_assert!(cell < arena.main_buckets());

        arena.add_count_weight(cell, dataset.weight(i));
        for s in 0..n_scores {
            let hess = hessians.as_ref().map(|h| h[[s, i]]);
            arena.add_grad(cell, s, gradients[[s, i]], hess);
        }
    }
}
