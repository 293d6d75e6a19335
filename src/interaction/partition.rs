//! The two-dimensional cut sweep.

use super::{FeatureGroup, InteractionOptions};
use crate::histograms::{quadrant_totals, HistogramArena, QUADRANT_BUCKETS};

/// Sweep every cut pair of a two-dimensional group and return the best
/// raw partition gain.
///
/// Requires the arena's main zone to hold corner-prefix-sums. The gain
/// of a cut pair is the sum over its four quadrants of
/// `grad_sum^2 / weight_sum` per score; a cut pair is legal only when
/// every quadrant holds at least `min_samples` samples. `best_gain`
/// starts at zero, so a sweep with no legal cut reports zero. With
/// the Pure option the parent partial gain is then subtracted, and a
/// cut-less sweep goes substantially negative for the caller to clamp.
///
/// The returned value is *raw*: it may be NaN, infinite, or a large
/// negative. The caller normalizes and classifies.
pub(crate) fn partition_two_dimensional(
    arena: &mut HistogramArena,
    group: &FeatureGroup,
    options: InteractionOptions,
    min_samples: usize,
) -> f64 {
    debug_assert_eq!(group.dimensions(), 2);
    let bins_x = group.entry(0).bin_count;
    let bins_y = group.entry(1).bin_count;
    let n_scores = arena.bucket_layout().score_count();
    let min_samples = min_samples as u64;

    let mut best_gain = 0.0_f64;
    for cut_x in 0..bins_x - 1 {
        for cut_y in 0..bins_y - 1 {
            quadrant_totals(arena, bins_x, bins_y, cut_x, cut_y);
            let aux = arena.aux_base();

            if (0..QUADRANT_BUCKETS).any(|q| arena.count(aux + q) < min_samples) {
                continue;
            }

            let mut gain = 0.0;
            for q in 0..QUADRANT_BUCKETS {
                let weight = arena.weight(aux + q);
                for s in 0..n_scores {
                    let grad = arena.grad(aux + q, s);
                    gain += grad * grad / weight;
                }
            }
            if best_gain < gain {
                best_gain = gain;
            }
        }
    }

    if options.is_pure() {
        // the corner bucket holds the full totals after the prefix pass
        let parent = bins_x * bins_y - 1;
        let weight = arena.weight(parent);
        for s in 0..n_scores {
            let grad = arena.grad(parent, s);
            best_gain -= grad * grad / weight;
        }
    }

    best_gain
}
