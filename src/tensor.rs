//! Sparse piecewise-constant score tensors.
//!
//! A [`SparseTensor`] is a step-function over a multidimensional grid of
//! bin coordinates. Each dimension is partitioned into *slices* by a
//! sorted array of *splits* (bin indices); every cell of the slice grid
//! carries a vector of scores. Boosting accumulates per-term score
//! updates into these tensors, merging differing partitions on the fly.
//!
//! # Buffer discipline
//!
//! The score buffer and each per-dimension split buffer are `Vec`s whose
//! *length* is the allocated capacity; the live prefix is defined by the
//! current slice counts (`score_count × ∏ slice_count[d]` scores,
//! `slice_count[d] − 1` splits). Growth never shrinks a buffer and a
//! failed size computation leaves the old buffer intact, so the tensor
//! stays usable at its prior size.
//!
//! # In-place traversal direction
//!
//! [`SparseTensor::expand`] and [`SparseTensor::add`] write into the same
//! buffer they read from. Both walk cells from the highest flat index to
//! the lowest so the write head never overtakes unread source cells; a
//! forward pass would corrupt the tensor.

use crate::{FloatScore, MAX_DIMENSIONS};

/// Slice capacity every dimension starts with.
pub const INITIAL_SLICE_CAPACITY: usize = 2;

/// Score cells allocated up front, before any slice growth.
const INITIAL_SCORE_CAPACITY: usize = 64;

/// Tensor buffer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// A buffer size computation overflowed `usize`.
    #[error("tensor buffer size computation overflowed")]
    CapacityOverflow,
}

/// One dimension of the slice grid.
#[derive(Debug, Clone)]
struct Dimension {
    /// Number of slices; always at least 1.
    n_slices: usize,
    /// Split coordinates; `len()` is the allocated capacity, the live
    /// prefix is `n_slices - 1` entries, strictly increasing, each in
    /// `(0, bin_count)`.
    splits: Vec<u32>,
}

/// Per-dimension cursor state for the reverse expand traversal.
struct ExpandCursor {
    /// Count of unconsumed splits (index one past the rightmost).
    split_pos: usize,
    /// Remaining bin edge in the expanded dimension.
    i_edge: usize,
}

/// Per-dimension cursor state for the reverse merge-add traversal.
struct MergeCursor {
    /// Unconsumed splits of `self` in this dimension.
    pos1: usize,
    /// Unconsumed splits of `rhs` in this dimension.
    pos2: usize,
    /// Slice count of the merged partition.
    n_merged: usize,
}

/// A mutable multidimensional step-function over binned coordinates.
#[derive(Debug, Clone)]
pub struct SparseTensor {
    n_scores: usize,
    n_dims: usize,
    /// `len()` is the dimension capacity; the first `n_dims` are active.
    dims: Vec<Dimension>,
    /// Flat scores; `len()` is the allocated capacity. Cell `(i_0, ..)`
    /// starts at `n_scores * Σ_d i_d * ∏_{e<d} slice_count[e]`.
    scores: Vec<FloatScore>,
    /// True when every dimension has one slice per bin.
    expanded: bool,
}

impl SparseTensor {
    /// Allocate a tensor with `dim_capacity` dimensions and `score_count`
    /// scores per cell.
    ///
    /// All dimensions start active with a single slice; the first
    /// `score_count` scores are zero.
    pub fn new(dim_capacity: usize, score_count: usize) -> Result<Self, TensorError> {
        assert!(dim_capacity <= MAX_DIMENSIONS);
        assert!(score_count >= 1);

        let score_capacity = INITIAL_SCORE_CAPACITY
            .checked_mul(score_count)
            .ok_or(TensorError::CapacityOverflow)?;

        let dims = (0..dim_capacity)
            .map(|_| Dimension {
                n_slices: 1,
                splits: vec![0; INITIAL_SLICE_CAPACITY - 1],
            })
            .collect();

        Ok(Self {
            n_scores: score_count,
            n_dims: dim_capacity,
            dims,
            scores: vec![0.0; score_capacity],
            expanded: false,
        })
    }

    #[inline]
    pub fn score_count(&self) -> usize {
        self.n_scores
    }

    #[inline]
    pub fn dim_count(&self) -> usize {
        self.n_dims
    }

    #[inline]
    pub fn dim_capacity(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Number of slices in dimension `d`.
    #[inline]
    pub fn slice_count(&self, d: usize) -> usize {
        self.dims[d].n_slices
    }

    /// Live split coordinates of dimension `d`.
    #[inline]
    pub fn splits(&self, d: usize) -> &[u32] {
        let dim = &self.dims[d];
        &dim.splits[..dim.n_slices - 1]
    }

    /// Number of live scores: `score_count × ∏ slice_count[d]`.
    #[inline]
    pub fn live_score_count(&self) -> usize {
        let mut total = self.n_scores;
        for dim in &self.dims[..self.n_dims] {
            // counting already-allocated cells, so this cannot overflow
            total *= dim.n_slices;
        }
        total
    }

    /// Live scores, cell-major.
    #[inline]
    pub fn scores(&self) -> &[FloatScore] {
        &self.scores[..self.live_score_count()]
    }

    /// Mutable live scores.
    #[inline]
    pub fn scores_mut(&mut self) -> &mut [FloatScore] {
        let live = self.live_score_count();
        &mut self.scores[..live]
    }

    /// Restrict or restore the active dimension count within capacity.
    ///
    /// Zero-dimensional tensors are legal and hold a single score vector
    /// (intercept terms).
    pub fn set_dim_count(&mut self, n_dims: usize) {
        assert!(n_dims <= self.dims.len());
        self.n_dims = n_dims;
    }

    /// Collapse every dimension back to a single slice and zero the base
    /// score vector. Capacity is retained.
    pub fn reset(&mut self) {
        for dim in &mut self.dims[..self.n_dims] {
            dim.n_slices = 1;
        }
        for score in &mut self.scores[..self.n_scores] {
            *score = 0.0;
        }
        self.expanded = false;
    }

    /// Set the slice count of dimension `d`, growing the split buffer if
    /// needed.
    ///
    /// Growth is geometric (half again the required splits) so repeated
    /// single-slice growth amortizes. An expanded tensor is already at
    /// its maximum size, so only shrinkage is legal then.
    pub fn set_slice_count(&mut self, d: usize, n_slices: usize) -> Result<(), TensorError> {
        debug_assert!(d < self.n_dims);
        debug_assert!(n_slices >= 1);
        let dim = &mut self.dims[d];
        debug_assert!(!self.expanded || n_slices <= dim.n_slices);

        let n_splits = n_slices - 1;
        if dim.splits.len() < n_splits {
            debug_assert!(!self.expanded);
            let grown = n_splits
                .checked_add(n_splits >> 1)
                .ok_or(TensorError::CapacityOverflow)?;
            dim.splits.resize(grown, 0);
        }
        // never shrink the buffer; only the live count moves
        dim.n_slices = n_slices;
        Ok(())
    }

    /// Replace dimension `d`'s partition with the given split set.
    ///
    /// `splits` must be strictly increasing bin coordinates, each in
    /// `(0, bin_count)` for the dimension's feature. The score buffer is
    /// grown to cover the new live region; newly exposed scores are
    /// zero.
    pub fn set_splits(&mut self, d: usize, splits: &[u32]) -> Result<(), TensorError> {
        debug_assert!(splits.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(splits.first().map_or(true, |&s| s > 0));
        self.set_slice_count(d, splits.len() + 1)?;
        self.dims[d].splits[..splits.len()].copy_from_slice(splits);
        let live = self.live_score_count();
        self.ensure_score_capacity(live);
        Ok(())
    }

    /// Grow the score buffer to hold at least `cells` scores.
    ///
    /// Newly exposed scores are zero. The buffer's natural 8-byte
    /// alignment satisfies all correctness requirements; wider SIMD
    /// alignment is purely a performance matter.
    pub fn ensure_score_capacity(&mut self, cells: usize) {
        if self.scores.len() < cells {
            self.scores.resize(cells, 0.0);
        }
    }

    /// Make `self` an exact structural and value copy of `rhs`.
    ///
    /// Both tensors must share the dimension and score counts.
    pub fn copy_from(&mut self, rhs: &SparseTensor) -> Result<(), TensorError> {
        assert_eq!(self.n_dims, rhs.n_dims);
        assert_eq!(self.n_scores, rhs.n_scores);

        let mut total = self.n_scores;
        for d in 0..self.n_dims {
            let n_slices = rhs.dims[d].n_slices;
            // copying live memory, so the product cannot overflow
            total *= n_slices;
            self.set_slice_count(d, n_slices)?;
            let live = n_slices - 1;
            self.dims[d].splits[..live].copy_from_slice(&rhs.dims[d].splits[..live]);
        }
        self.ensure_score_capacity(total);
        self.scores[..total].copy_from_slice(&rhs.scores[..total]);
        self.expanded = rhs.expanded;
        Ok(())
    }

    /// Multiply every live score by `v`.
    ///
    /// Returns `true` if any product came out NaN or infinite. The bad
    /// values are written back as-is; the report is the signal and the
    /// caller decides what replaces them.
    pub fn multiply_and_check(&mut self, v: f64) -> bool {
        let live = self.live_score_count();
        let mut bad = false;
        for score in &mut self.scores[..live] {
            let val = *score * v;
            bad |= !val.is_finite();
            *score = val;
        }
        bad
    }

    /// Pointwise-add a dense score buffer into an expanded tensor,
    /// trapping non-finite results.
    ///
    /// NaN addends count as zero; sums saturate at the finite extremes
    /// instead of overflowing to infinity, so later arithmetic stays
    /// finite. The `<=`/`>=` comparisons against the extremes stand in
    /// for infinity tests that some compilers optimize away.
    pub fn add_expanded_clamped(&mut self, from_scores: &[FloatScore]) {
        debug_assert!(self.expanded);
        let live = self.live_score_count();
        debug_assert_eq!(from_scores.len(), live);

        for (to, &from) in self.scores[..live].iter_mut().zip(from_scores) {
            let addend = if from.is_nan() { 0.0 } else { from };
            let mut score = *to + addend;
            if score <= FloatScore::MIN {
                score = FloatScore::MIN;
            }
            if FloatScore::MAX <= score {
                score = FloatScore::MAX;
            }
            *to = score;
        }
    }

    /// Rewrite the tensor so every bin of every dimension is its own
    /// slice, broadcasting each old slice's scores over the bins it
    /// covered. Idempotent once expanded.
    ///
    /// `bin_counts` gives the grid extent per active dimension.
    pub fn expand(&mut self, bin_counts: &[usize]) -> Result<(), TensorError> {
        if self.expanded {
            return Ok(());
        }
        debug_assert_eq!(bin_counts.len(), self.n_dims);

        if self.n_dims != 0 {
            let mut cursors: Vec<ExpandCursor> = Vec::with_capacity(self.n_dims);
            let mut old_total = self.n_scores;
            let mut new_total = self.n_scores;
            for d in 0..self.n_dims {
                let n_slices = self.dims[d].n_slices;
                debug_assert!(n_slices <= bin_counts[d]);
                // live memory, cannot overflow
                old_total *= n_slices;
                new_total = new_total
                    .checked_mul(bin_counts[d])
                    .ok_or(TensorError::CapacityOverflow)?;
                cursors.push(ExpandCursor {
                    split_pos: n_slices - 1,
                    i_edge: bin_counts[d],
                });
            }

            self.ensure_score_capacity(new_total);

            // reverse walk: output cells from the top down, source cells
            // trailing behind so nothing unread is overwritten
            let mut src = old_total;
            let mut top = new_total;
            loop {
                debug_assert!(src <= top);
                self.scores
                    .copy_within(src - self.n_scores..src, top - self.n_scores);
                top -= self.n_scores;
                if top == 0 {
                    break;
                }

                let mut stride = self.n_scores;
                for d in 0..self.n_dims {
                    let cursor = &mut cursors[d];
                    let dim = &self.dims[d];
                    debug_assert!(cursor.split_pos < cursor.i_edge);
                    if cursor.split_pos > 0 {
                        let split = dim.splits[cursor.split_pos - 1] as usize;
                        cursor.i_edge -= 1;
                        if cursor.i_edge <= split {
                            // crossed into the slice to the left
                            cursor.split_pos -= 1;
                            src -= stride;
                        }
                        break;
                    } else if cursor.i_edge > 1 {
                        cursor.i_edge -= 1;
                        break;
                    } else {
                        // leftmost slice finished: rewind this dimension
                        // and carry into the next one
                        src -= stride;
                        stride *= dim.n_slices;
                        src += stride;
                        cursor.split_pos = dim.n_slices - 1;
                        cursor.i_edge = bin_counts[d];
                    }
                }
            }
            debug_assert_eq!(top, 0);
            debug_assert_eq!(src, self.n_scores);

            // every dimension now gets the dense partition 1, 2, ..
            for d in 0..self.n_dims {
                let n_slices = bin_counts[d];
                if self.dims[d].n_slices != n_slices {
                    self.set_slice_count(d, n_slices)?;
                    for k in 0..n_slices - 1 {
                        self.dims[d].splits[k] = (k + 1) as u32;
                    }
                }
            }
        }
        self.expanded = true;
        Ok(())
    }

    /// Add `rhs` pointwise over the common grid.
    ///
    /// The resulting partition along each dimension is the sorted union
    /// of both split sets; scores are summed over the merged cells.
    pub fn add(&mut self, rhs: &SparseTensor) -> Result<(), TensorError> {
        assert_eq!(self.n_dims, rhs.n_dims);
        assert_eq!(self.n_scores, rhs.n_scores);

        if self.n_dims == 0 {
            for (to, &from) in self.scores[..self.n_scores]
                .iter_mut()
                .zip(&rhs.scores[..self.n_scores])
            {
                *to += from;
            }
            return Ok(());
        }

        // pass 1 (forward): per-dimension merged slice counts and totals
        let mut cursors: Vec<MergeCursor> = Vec::with_capacity(self.n_dims);
        let mut total1 = self.n_scores;
        let mut total2 = self.n_scores;
        let mut new_total = self.n_scores;
        for d in 0..self.n_dims {
            let s1 = self.dims[d].n_slices;
            let s2 = rhs.dims[d].n_slices;
            // live memory on both sides, cannot overflow
            total1 *= s1;
            total2 *= s2;

            let a = &self.dims[d].splits[..s1 - 1];
            let b = &rhs.dims[d].splits[..s2 - 1];
            let mut i = 0;
            let mut j = 0;
            let mut n_merged = 1;
            loop {
                // check the rhs first: a tensor that is added to a lot
                // tends to carry more splits than the increment
                if j == b.len() {
                    n_merged += a.len() - i;
                    break;
                }
                if i == a.len() {
                    n_merged += b.len() - j;
                    break;
                }
                // moving either pointer contributes one unique split
                n_merged += 1;
                let d1 = a[i];
                let d2 = b[j];
                if d1 <= d2 {
                    i += 1;
                }
                if d2 <= d1 {
                    j += 1;
                }
            }
            debug_assert!(n_merged <= s1 + s2 - 1);
            new_total = new_total
                .checked_mul(n_merged)
                .ok_or(TensorError::CapacityOverflow)?;
            cursors.push(MergeCursor {
                pos1: s1 - 1,
                pos2: s2 - 1,
                n_merged,
            });
        }

        self.ensure_score_capacity(new_total);

        // pass 2 (reverse): merged scores, top cell first
        let mut src1 = total1;
        let mut src2 = total2;
        let mut top = new_total;
        loop {
            debug_assert!(src1 <= top);
            for k in 1..=self.n_scores {
                self.scores[top - k] = self.scores[src1 - k] + rhs.scores[src2 - k];
            }
            top -= self.n_scores;
            if top == 0 {
                break;
            }

            let mut stride1 = self.n_scores;
            let mut stride2 = self.n_scores;
            for d in 0..self.n_dims {
                let cursor = &mut cursors[d];
                match (cursor.pos1 > 0, cursor.pos2 > 0) {
                    (true, true) => {
                        let d1 = self.dims[d].splits[cursor.pos1 - 1];
                        let d2 = rhs.dims[d].splits[cursor.pos2 - 1];
                        // advance both on equal splits, else only the larger
                        if d2 <= d1 {
                            cursor.pos1 -= 1;
                            src1 -= stride1;
                        }
                        if d1 <= d2 {
                            cursor.pos2 -= 1;
                            src2 -= stride2;
                        }
                        break;
                    }
                    (true, false) => {
                        cursor.pos1 -= 1;
                        src1 -= stride1;
                        break;
                    }
                    (false, true) => {
                        cursor.pos2 -= 1;
                        src2 -= stride2;
                        break;
                    }
                    (false, false) => {
                        // both sides exhausted in this dimension: rewind
                        // to its last slice and carry into the next
                        src1 -= stride1;
                        src2 -= stride2;
                        stride1 *= self.dims[d].n_slices;
                        stride2 *= rhs.dims[d].n_slices;
                        src1 += stride1;
                        src2 += stride2;
                        cursor.pos1 = self.dims[d].n_slices - 1;
                        cursor.pos2 = rhs.dims[d].n_slices - 1;
                    }
                }
            }
        }
        debug_assert_eq!(top, 0);
        debug_assert_eq!(src1, self.n_scores);
        debug_assert_eq!(src2, self.n_scores);

        // pass 3 (reverse): merged split arrays, written in place
        for d in 0..self.n_dims {
            let n_merged = cursors[d].n_merged;
            let orig1 = self.dims[d].n_slices;
            let orig2 = rhs.dims[d].n_slices;
            self.set_slice_count(d, n_merged)?;

            let rhs_splits = &rhs.dims[d].splits[..orig2 - 1];
            let mut p1 = orig1 - 1;
            let mut p2 = orig2 - 1;
            let mut ptop = n_merged - 1;
            loop {
                debug_assert!(p1 <= ptop);
                debug_assert!(p2 <= ptop);
                if ptop == p1 {
                    // remaining self splits are already in place
                    break;
                }
                if ptop == p2 {
                    // only rhs splits remain below the write head
                    self.dims[d].splits[..ptop].copy_from_slice(&rhs_splits[..ptop]);
                    break;
                }
                let d1 = self.dims[d].splits[p1 - 1];
                let d2 = rhs_splits[p2 - 1];
                if d2 <= d1 {
                    p1 -= 1;
                }
                if d1 <= d2 {
                    p2 -= 1;
                }
                ptop -= 1;
                self.dims[d].splits[ptop] = d1.max(d2);
            }
        }
        Ok(())
    }

    /// Scores governing the cell that contains bin coordinate `coords`.
    pub fn sample(&self, coords: &[usize]) -> &[FloatScore] {
        debug_assert_eq!(coords.len(), self.n_dims);
        let mut cell = 0;
        let mut stride = 1;
        for (d, &bin) in coords.iter().enumerate() {
            let dim = &self.dims[d];
            let live = &dim.splits[..dim.n_slices - 1];
            let slice = live.partition_point(|&split| (split as usize) <= bin);
            cell += slice * stride;
            stride *= dim.n_slices;
        }
        let base = cell * self.n_scores;
        &self.scores[base..base + self.n_scores]
    }

    /// Structural and value equality over the live region.
    pub fn is_equal(&self, rhs: &SparseTensor) -> bool {
        if self.n_dims != rhs.n_dims || self.n_scores != rhs.n_scores {
            return false;
        }
        let mut total = self.n_scores;
        for d in 0..self.n_dims {
            let n_slices = self.dims[d].n_slices;
            if n_slices != rhs.dims[d].n_slices {
                return false;
            }
            total *= n_slices;
            if self.dims[d].splits[..n_slices - 1] != rhs.dims[d].splits[..n_slices - 1] {
                return false;
            }
        }
        self.scores[..total] == rhs.scores[..total]
    }
}

// =============================================================================
// Tests
// =============================================================================
