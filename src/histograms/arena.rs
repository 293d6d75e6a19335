//! Bucket layout, overflow-checked sizing, and the arena buffer.

use crate::data::TaskKind;
use crate::FloatScore;

/// Auxiliary buckets reserved for the two-dimensional partitioner's
/// quadrant scratch.
const AUX_BUCKETS_FOR_SPLITTING: usize = 4;

/// Arena sizing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistogramError {
    /// A bucket count or slot count computation overflowed `usize`.
    #[error("histogram bucket sizing overflowed")]
    SizeOverflow,
}

// =============================================================================
// BucketLayout
// =============================================================================

/// Shape of one histogram bucket.
///
/// Every bucket carries a sample count and a weight sum; on top of that,
/// regression buckets hold one gradient sum per score while
/// classification buckets hold a (gradient, hessian) pair per score. The
/// hessian slots are not consumed by the pair gain, but the layout keeps
/// them so classification arenas match the model's gradient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLayout {
    n_scores: usize,
    has_hessians: bool,
}

impl BucketLayout {
    pub fn for_task(task: TaskKind) -> Self {
        Self {
            n_scores: task.score_count(),
            has_hessians: task.is_classification(),
        }
    }

    #[inline]
    pub fn score_count(&self) -> usize {
        self.n_scores
    }

    #[inline]
    pub fn has_hessians(&self) -> bool {
        self.has_hessians
    }

    /// Float slots per bucket in the stats buffer.
    #[inline]
    pub fn stats_per_bucket(&self) -> usize {
        self.n_scores * if self.has_hessians { 2 } else { 1 }
    }

    #[inline]
    fn grad_slot(&self, score: usize) -> usize {
        if self.has_hessians {
            2 * score
        } else {
            score
        }
    }

    #[inline]
    fn hess_slot(&self, score: usize) -> usize {
        debug_assert!(self.has_hessians);
        2 * score + 1
    }
}

// =============================================================================
// ArenaLayout
// =============================================================================

/// Bucket counts for one query, computed with overflow checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaLayout {
    /// One bucket per bin-tuple: `∏ bin_count[d]`.
    pub main_buckets: usize,
    /// Trailing scratch zone: `max(Σ prefix products, 4)`.
    pub aux_buckets: usize,
    /// `main_buckets + aux_buckets`.
    pub total_buckets: usize,
    /// Per-bucket shape.
    pub bucket: BucketLayout,
}

impl ArenaLayout {
    /// Size an arena for the given per-dimension bin counts.
    ///
    /// Every multiplication and addition is checked: the caller hands us
    /// an arbitrary feature group, so the product of its bin counts can
    /// overflow even though each factor is small. Callers must have
    /// filtered out single-bin features; with every `bin_count >= 2` the
    /// totals-builder scratch requirement grows strictly slower than the
    /// main zone, so its running sum cannot overflow before the product
    /// check fires.
    pub fn size(bin_counts: &[usize], bucket: BucketLayout) -> Result<Self, HistogramError> {
        let mut aux_for_totals: usize = 0;
        let mut main_buckets: usize = 1;
        for &bin_count in bin_counts {
            debug_assert!(bin_count >= 2);
            debug_assert!(aux_for_totals < main_buckets);
            aux_for_totals = aux_for_totals
                .checked_add(main_buckets)
                .ok_or(HistogramError::SizeOverflow)?;
            main_buckets = main_buckets
                .checked_mul(bin_count)
                .ok_or(HistogramError::SizeOverflow)?;
        }

        let aux_buckets = aux_for_totals.max(AUX_BUCKETS_FOR_SPLITTING);
        let total_buckets = main_buckets
            .checked_add(aux_buckets)
            .ok_or(HistogramError::SizeOverflow)?;
        // the stats buffer is the widest allocation; check its slot count
        total_buckets
            .checked_mul(bucket.stats_per_bucket())
            .ok_or(HistogramError::SizeOverflow)?;

        Ok(Self {
            main_buckets,
            aux_buckets,
            total_buckets,
            bucket,
        })
    }
}

// =============================================================================
// HistogramArena
// =============================================================================

/// The reusable bucket buffer.
///
/// Owned by a scorer and re-grown, never shrunk, across queries. Only
/// the region described by the most recent [`HistogramArena::ensure`]
/// call is meaningful.
#[derive(Debug)]
pub struct HistogramArena {
    bucket: BucketLayout,
    main_buckets: usize,
    total_buckets: usize,
    counts: Vec<u64>,
    weights: Vec<f64>,
    stats: Vec<FloatScore>,
}

impl HistogramArena {
    pub fn new() -> Self {
        Self {
            bucket: BucketLayout {
                n_scores: 1,
                has_hessians: false,
            },
            main_buckets: 0,
            total_buckets: 0,
            counts: Vec::new(),
            weights: Vec::new(),
            stats: Vec::new(),
        }
    }

    /// Adopt a layout, growing the buffers monotonically and zeroing the
    /// active region.
    pub fn ensure(&mut self, layout: &ArenaLayout) {
        // slot count was overflow-checked by ArenaLayout::size
        let stats_len = layout.total_buckets * layout.bucket.stats_per_bucket();
        if self.counts.len() < layout.total_buckets {
            self.counts.resize(layout.total_buckets, 0);
            self.weights.resize(layout.total_buckets, 0.0);
        }
        if self.stats.len() < stats_len {
            self.stats.resize(stats_len, 0.0);
        }
        self.counts[..layout.total_buckets].fill(0);
        self.weights[..layout.total_buckets].fill(0.0);
        self.stats[..stats_len].fill(0.0);
        self.bucket = layout.bucket;
        self.main_buckets = layout.main_buckets;
        self.total_buckets = layout.total_buckets;
    }

    #[inline]
    pub fn bucket_layout(&self) -> BucketLayout {
        self.bucket
    }

    #[inline]
    pub fn main_buckets(&self) -> usize {
        self.main_buckets
    }

    /// Index of the first auxiliary bucket.
    #[inline]
    pub fn aux_base(&self) -> usize {
        self.main_buckets
    }

    #[inline]
    fn stats_base(&self, bucket: usize) -> usize {
        debug_assert!(bucket < self.total_buckets);
        bucket * self.bucket.stats_per_bucket()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn count(&self, bucket: usize) -> u64 {
        self.counts[bucket]
    }

    #[inline]
    pub fn weight(&self, bucket: usize) -> f64 {
        self.weights[bucket]
    }

    #[inline]
    pub fn grad(&self, bucket: usize, score: usize) -> FloatScore {
        self.stats[self.stats_base(bucket) + self.bucket.grad_slot(score)]
    }

    #[inline]
    pub fn hess(&self, bucket: usize, score: usize) -> FloatScore {
        self.stats[self.stats_base(bucket) + self.bucket.hess_slot(score)]
    }

    // -------------------------------------------------------------------------
    // Accumulation
    // -------------------------------------------------------------------------

    /// Record one sample's membership in `bucket`.
    #[inline]
    pub fn add_count_weight(&mut self, bucket: usize, weight: f64) {
        self.counts[bucket] += 1;
        self.weights[bucket] += weight;
    }

    /// Accumulate one score's gradient (and hessian) into `bucket`.
    #[inline]
    pub fn add_grad(
        &mut self,
        bucket: usize,
        score: usize,
        grad: FloatScore,
        hess: Option<FloatScore>,
    ) {
        let base = self.stats_base(bucket);
        self.stats[base + self.bucket.grad_slot(score)] += grad;
        if let Some(hess) = hess {
            self.stats[base + self.bucket.hess_slot(score)] += hess;
        }
    }

    /// `dst += src`, element-wise over all bucket slots.
    #[inline]
    pub fn accumulate(&mut self, dst: usize, src: usize) {
        let count = self.counts[src];
        self.counts[dst] += count;
        let weight = self.weights[src];
        self.weights[dst] += weight;
        let dst_base = self.stats_base(dst);
        let src_base = self.stats_base(src);
        for k in 0..self.bucket.stats_per_bucket() {
            let stat = self.stats[src_base + k];
            self.stats[dst_base + k] += stat;
        }
    }

    /// `dst -= src`, element-wise over all bucket slots.
    #[inline]
    pub fn subtract(&mut self, dst: usize, src: usize) {
        debug_assert!(self.counts[dst] >= self.counts[src]);
        let count = self.counts[src];
        self.counts[dst] -= count;
        let weight = self.weights[src];
        self.weights[dst] -= weight;
        let dst_base = self.stats_base(dst);
        let src_base = self.stats_base(src);
        for k in 0..self.bucket.stats_per_bucket() {
            let stat = self.stats[src_base + k];
            self.stats[dst_base + k] -= stat;
        }
    }

    /// `dst = src`, all bucket slots.
    #[inline]
    pub fn copy_bucket(&mut self, dst: usize, src: usize) {
        let count = self.counts[src];
        self.counts[dst] = count;
        let weight = self.weights[src];
        self.weights[dst] = weight;
        let dst_base = self.stats_base(dst);
        let src_base = self.stats_base(src);
        for k in 0..self.bucket.stats_per_bucket() {
            let stat = self.stats[src_base + k];
            self.stats[dst_base + k] = stat;
        }
    }
}

impl Default for HistogramArena {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
