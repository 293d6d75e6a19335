//! Histogram bucket arena for interaction queries.
//!
//! A query bins every sample into a multidimensional grid of buckets,
//! each holding aggregate statistics (sample count, weight, per-score
//! gradient and, for classification, hessian sums). The arena is a flat
//! struct-of-arrays buffer: a *main zone* of one bucket per bin-tuple
//! followed by an *auxiliary zone* whose first four buckets are the
//! partitioner's quadrant scratch.
//!
//! Arena sizing is overflow-checked at every step; an overflow surfaces
//! as [`HistogramError::SizeOverflow`] and the query is abandoned.
//!
//! After binning, [`build_totals`] rewrites the main zone in place into
//! inclusive corner-prefix-sums, after which [`quadrant_totals`] answers
//! any two-dimensional cut query in constant time.

mod arena;
mod totals;

pub use arena::{ArenaLayout, BucketLayout, HistogramArena, HistogramError};
pub use totals::{build_totals, quadrant_totals, QUADRANT_BUCKETS};
