//! Corner-prefix-sum totals and the two-dimensional quadrant query.

use super::HistogramArena;

/// Auxiliary-zone roles for [`quadrant_totals`], in order: low-low,
/// high-low, low-high, high-high.
pub const QUADRANT_BUCKETS: usize = 4;

pub(crate) const QUADRANT_LOW_LOW: usize = 0;
pub(crate) const QUADRANT_HIGH_LOW: usize = 1;
pub(crate) const QUADRANT_LOW_HIGH: usize = 2;
pub(crate) const QUADRANT_HIGH_HIGH: usize = 3;

/// Rewrite the arena's main zone in place into inclusive corner sums.
///
/// After this pass, the bucket at coordinate `(i_0, .., i_{D-1})` holds
/// the aggregate over every bin-tuple `(j_0, .., j_{D-1})` with
/// `j_d <= i_d` in all dimensions, and the last main bucket holds the
/// grand totals.
///
/// One cumulative pass per dimension; within a pass, cells are visited
/// in ascending flat order so the read at `i - stride` is already a
/// completed prefix and the write at `i` never precedes it.
pub fn build_totals(arena: &mut HistogramArena, bin_counts: &[usize]) {
    let main_buckets = arena.main_buckets();
    debug_assert_eq!(main_buckets, bin_counts.iter().product::<usize>());

    let mut stride = 1;
    for &bin_count in bin_counts {
        for i in 0..main_buckets {
            if (i / stride) % bin_count != 0 {
                arena.accumulate(i, i - stride);
            }
        }
        stride *= bin_count;
    }
}

/// Fill the first four auxiliary buckets with the aggregates of the four
/// regions induced by cutting dimension 0 after bin `cut_x` and
/// dimension 1 after bin `cut_y`.
///
/// Requires the main zone to hold corner sums (see [`build_totals`]).
/// Region aggregates come from inclusion-exclusion over corner buckets;
/// additions are applied before subtractions so the unsigned sample
/// counts never dip below zero mid-computation.
pub fn quadrant_totals(
    arena: &mut HistogramArena,
    bins_x: usize,
    bins_y: usize,
    cut_x: usize,
    cut_y: usize,
) {
    debug_assert!(cut_x < bins_x - 1);
    debug_assert!(cut_y < bins_y - 1);

    let corner = |x: usize, y: usize| x + bins_x * y;
    let aux = arena.aux_base();

    // low-low: x <= cut_x, y <= cut_y
    arena.copy_bucket(aux + QUADRANT_LOW_LOW, corner(cut_x, cut_y));

    // high-low: x > cut_x, y <= cut_y
    arena.copy_bucket(aux + QUADRANT_HIGH_LOW, corner(bins_x - 1, cut_y));
    arena.subtract(aux + QUADRANT_HIGH_LOW, corner(cut_x, cut_y));

    // low-high: x <= cut_x, y > cut_y
    arena.copy_bucket(aux + QUADRANT_LOW_HIGH, corner(cut_x, bins_y - 1));
    arena.subtract(aux + QUADRANT_LOW_HIGH, corner(cut_x, cut_y));

    // high-high: x > cut_x, y > cut_y
    arena.copy_bucket(aux + QUADRANT_HIGH_HIGH, corner(bins_x - 1, bins_y - 1));
    arena.accumulate(aux + QUADRANT_HIGH_HIGH, corner(cut_x, cut_y));
    arena.subtract(aux + QUADRANT_HIGH_HIGH, corner(bins_x - 1, cut_y));
    arena.subtract(aux + QUADRANT_HIGH_HIGH, corner(cut_x, bins_y - 1));
}

// =============================================================================
// Tests
// =============================================================================
