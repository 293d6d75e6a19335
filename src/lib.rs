//! gamboost: interaction scoring for gradient-boosted additive models.
//!
//! This crate implements the numeric core of a GA(2)M-style boosting
//! library: scoring how much a pair of binned features would gain from
//! being modeled as a joint term, and the sparse piecewise-constant
//! tensors that per-term scores are accumulated into during boosting.
//!
//! # Key Types
//!
//! - [`InteractionScorer`] - Scores one feature group per call, reusing
//!   its histogram arena across calls
//! - [`InteractionDataset`] - Binned features plus per-sample gradients
//!   and weights
//! - [`SparseTensor`] - Mutable multidimensional step-function over bin
//!   coordinates
//! - [`rank_pairs`] - Rank every feature pair of a dataset by strength
//!
//! # Scoring a pair
//!
//! Build an [`InteractionDataset`], wrap it in an [`InteractionScorer`],
//! and call [`InteractionScorer::evaluate`] with the two feature indices.
//! The result is `0.0` when there is nothing to score, a non-negative
//! finite gain, or [`ILLEGAL_GAIN`] for candidates that could not be
//! scored (more than two dimensions, numeric overflow). NaN and
//! infinities never escape.

pub mod data;
pub mod histograms;
pub mod interaction;
pub mod tensor;
pub mod utils;

// =============================================================================
// Crate-wide constants
// =============================================================================

/// Floating point type used for tensor scores and histogram statistics.
///
/// One width for the whole crate, chosen at compile time.
pub type FloatScore = f64;

/// Maximum number of dimensions a feature group or tensor may carry.
pub const MAX_DIMENSIONS: usize = 64;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Scoring (most users want these)
pub use interaction::{
    rank_pairs, InteractionError, InteractionOptions, InteractionScorer, PairStrength,
    ILLEGAL_GAIN,
};

// Data types (for preparing inputs)
pub use data::{DatasetError, InteractionDataset, TaskKind};

// Tensor type (for consuming fitted terms)
pub use tensor::{SparseTensor, TensorError};

// Shared utilities
pub use utils::Parallelism;
