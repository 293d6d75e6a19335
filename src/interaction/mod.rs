//! Interaction-strength evaluation.
//!
//! The entry point is [`InteractionScorer::evaluate`]: given a group of
//! feature indices, it bins the dataset's gradients into a
//! multidimensional histogram, builds corner-prefix-sum totals, sweeps
//! every two-dimensional cut pair for the best partition gain, and
//! normalizes the result by the total sample weight.
//!
//! A query yields one of three things:
//!
//! - `0.0` when the query is well-formed but there is nothing to score
//!   (empty group, single-bin feature, no samples, degenerate target,
//!   or no legal cut);
//! - a non-negative finite gain: the candidate's strength;
//! - [`ILLEGAL_GAIN`] when the candidate could not be scored (more than
//!   two dimensions, numeric overflow). Sorting candidates best-first
//!   places these last without relying on NaN ordering.
//!
//! NaN and infinities never escape to the caller.

mod bin;
mod partition;
mod rank;

pub use rank::{rank_pairs, PairStrength};

use serde::{Deserialize, Serialize};

use crate::data::{InteractionDataset, TaskKind};
use crate::histograms::{build_totals, ArenaLayout, BucketLayout, HistogramArena, HistogramError};
use crate::tensor::TensorError;
use crate::utils::CountedLog;
use crate::MAX_DIMENSIONS;

/// Strength reported for candidates that could not be scored.
///
/// The lowest finite score value: a large finite negative that ranks
/// after every legal strength, chosen over NaN so ordinary comparisons
/// order candidates correctly.
pub const ILLEGAL_GAIN: f64 = -f64::MAX;

/// Entry/parameter traces are emitted in full this many times per
/// process before demoting to trace level.
static PARAMETER_LOGS: CountedLog = CountedLog::new(10);

// =============================================================================
// Errors
// =============================================================================

/// Interaction query errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    /// A parameter failed validation; the query cannot be retried as-is.
    #[error("illegal parameter: {0}")]
    IllegalParam(&'static str),

    /// An allocation sizing step overflowed. The candidate stays
    /// unscored; callers treat it like [`ILLEGAL_GAIN`].
    #[error("allocation size computation overflowed")]
    OutOfMemory,
}

impl From<HistogramError> for InteractionError {
    fn from(_: HistogramError) -> Self {
        InteractionError::OutOfMemory
    }
}

impl From<TensorError> for InteractionError {
    fn from(_: TensorError) -> Self {
        InteractionError::OutOfMemory
    }
}

// =============================================================================
// Options
// =============================================================================

/// Bit-word of query options.
///
/// Only [`InteractionOptions::PURE`] is recognized; unknown bits are
/// logged and ignored so newer callers degrade gracefully against older
/// engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionOptions {
    bits: u64,
}

impl InteractionOptions {
    /// Subtract the parent partial gain at the end of partitioning,
    /// leaving only the interaction-specific component.
    pub const PURE: u64 = 0x1;

    const KNOWN: u64 = Self::PURE;

    pub fn new() -> Self {
        Self::default()
    }

    /// Construct from a raw bit word, keeping unknown bits (they are
    /// reported, then ignored, at evaluation time).
    pub fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Enable the pure-gain computation.
    pub fn pure(mut self) -> Self {
        self.bits |= Self::PURE;
        self
    }

    #[inline]
    pub fn is_pure(&self) -> bool {
        self.bits & Self::PURE != 0
    }

    #[inline]
    fn unknown_bits(&self) -> u64 {
        self.bits & !Self::KNOWN
    }
}

// =============================================================================
// FeatureGroup
// =============================================================================

/// One dimension of a query's feature group.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupEntry {
    pub feature: usize,
    pub bin_count: usize,
}

/// The ordered feature descriptors of one query.
///
/// Built per query on the scorer's stack; every entry has at least two
/// bins (single-bin features short-circuit before the group is built).
#[derive(Debug, Clone)]
pub(crate) struct FeatureGroup {
    entries: Vec<GroupEntry>,
}

impl FeatureGroup {
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.entries.len()
    }

    /// Dimensions that can actually partition; equal to `dimensions()`
    /// for interaction groups since trivial features never get here.
    #[inline]
    pub fn significant_dimensions(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    #[inline]
    pub fn entry(&self, d: usize) -> GroupEntry {
        self.entries[d]
    }

    pub fn bin_counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.bin_count).collect()
    }
}

// =============================================================================
// InteractionScorer
// =============================================================================

/// Scores interaction candidates against one dataset.
///
/// The scorer owns the histogram arena, which is re-grown and never
/// released across queries, so scoring many candidates allocates only
/// when a larger grid comes along. A scorer is single-threaded; to score
/// candidates in parallel, give each worker its own scorer (see
/// [`rank_pairs`]).
pub struct InteractionScorer<'a> {
    dataset: &'a InteractionDataset,
    arena: HistogramArena,
    enter_logs: CountedLog,
    exit_logs: CountedLog,
}

impl<'a> InteractionScorer<'a> {
    pub fn new(dataset: &'a InteractionDataset) -> Self {
        Self {
            dataset,
            arena: HistogramArena::new(),
            enter_logs: CountedLog::new(10),
            exit_logs: CountedLog::new(10),
        }
    }

    #[inline]
    pub fn dataset(&self) -> &'a InteractionDataset {
        self.dataset
    }

    /// Evaluate the interaction strength of a feature group.
    ///
    /// `min_samples_for_child_split` bounds how small a partitioned
    /// region may be; values below 1 are clamped to 1.
    ///
    /// See the module docs for the meaning of the returned value. An
    /// `Err` means the candidate is unscored: `IllegalParam` for invalid
    /// feature indices, `OutOfMemory` when a sizing step overflowed.
    pub fn evaluate(
        &mut self,
        feature_indices: &[usize],
        options: InteractionOptions,
        min_samples_for_child_split: i64,
    ) -> Result<f64, InteractionError> {
        PARAMETER_LOGS.log(format_args!(
            "evaluate interaction: features={:?} options={:#x} min_samples_for_child_split={}",
            feature_indices,
            options.bits(),
            min_samples_for_child_split,
        ));

        if options.unknown_bits() != 0 {
            log::error!(
                "interaction options contain unknown flags {:#x}; ignoring the extras",
                options.unknown_bits()
            );
        }

        let min_samples = if min_samples_for_child_split >= 1 {
            // a dataset can never hold more than usize::MAX samples, so
            // clamping an oversized request changes nothing
            usize::try_from(min_samples_for_child_split).unwrap_or(usize::MAX)
        } else {
            log::warn!("min_samples_for_child_split cannot be less than 1; adjusting to 1");
            1
        };

        if feature_indices.is_empty() {
            log::info!("interaction query with an empty feature list");
            return Ok(0.0);
        }
        if feature_indices.len() > MAX_DIMENSIONS {
            log::warn!(
                "interaction query with {} dimensions would exhaust memory",
                feature_indices.len()
            );
            return Err(InteractionError::OutOfMemory);
        }

        let mut entries = Vec::with_capacity(feature_indices.len());
        for &feature in feature_indices {
            if feature >= self.dataset.n_features() {
                log::error!(
                    "feature index {feature} is out of range for {} features",
                    self.dataset.n_features()
                );
                return Err(InteractionError::IllegalParam("feature index out of range"));
            }
            let bin_count = self.dataset.bin_count(feature);
            if bin_count <= 1 {
                log::info!("feature group contains feature {feature} with only 1 bin");
                return Ok(0.0);
            }
            entries.push(GroupEntry { feature, bin_count });
        }

        if self.dataset.n_samples() == 0 {
            // no samples, no basis to claim an interaction exists
            log::info!("interaction query over zero samples");
            return Ok(0.0);
        }
        if let TaskKind::Classification { n_classes: 1 } = self.dataset.task() {
            log::info!("target with 1 class perfectly predicts itself");
            return Ok(0.0);
        }

        let group = FeatureGroup { entries };
        self.strength_internal(&group, options, min_samples)
    }

    /// The sized-and-validated path: bin, build totals, partition,
    /// normalize, classify.
    fn strength_internal(
        &mut self,
        group: &FeatureGroup,
        options: InteractionOptions,
        min_samples: usize,
    ) -> Result<f64, InteractionError> {
        self.enter_logs
            .log(format_args!("entered interaction strength core"));

        let bin_counts = group.bin_counts();
        let bucket = BucketLayout::for_task(self.dataset.task());
        let layout = ArenaLayout::size(&bin_counts, bucket)?;
        self.arena.ensure(&layout);

        bin::bin_interaction(&mut self.arena, group, self.dataset);
        build_totals(&mut self.arena, &bin_counts);

        let result = if group.significant_dimensions() == 2 {
            log::debug!("starting two-dimensional cut sweep");
            let best_gain =
                partition::partition_two_dimensional(&mut self.arena, group, options, min_samples);

            // dividing before classifying matters: a sub-unit total
            // weight can push a finite raw gain over to +inf
            let total_weight = self.dataset.total_weight();
            debug_assert!(total_weight > 0.0);
            let best_gain = best_gain / total_weight;

            if best_gain.is_nan() || best_gain == f64::INFINITY {
                ILLEGAL_GAIN
            } else if best_gain < 0.0 {
                // gain cannot legally be negative; small negatives are
                // parent-subtraction noise, anything below the finite
                // range means no legal cut was ever measured
                if best_gain >= -f64::MAX {
                    0.0
                } else {
                    ILLEGAL_GAIN
                }
            } else {
                best_gain
            }
        } else {
            // only pairs are handled; flag the candidate as unscored
            // rather than guess a higher-order partition
            log::warn!(
                "{}-dimension interactions are not handled; reporting the illegal-gain sentinel",
                group.significant_dimensions()
            );
            ILLEGAL_GAIN
        };

        debug_assert!(result == ILLEGAL_GAIN || (result >= 0.0 && result.is_finite()));
        self.exit_logs
            .log(format_args!("exited interaction strength core: {result:e}"));
        Ok(result)
    }
}

// =============================================================================
// Tests
// =============================================================================
