//! Dataset container for interaction scoring.
//!
//! This module provides [`InteractionDataset`]: pre-binned ordinal
//! features together with the per-sample, per-score gradients (and, for
//! classification, hessians) and optional sample weights that interaction
//! queries aggregate over.
//!
//! # Storage Layout
//!
//! Binned features are stored **feature-major**: `[n_features, n_samples]`.
//! Gradients and hessians are stored `[score_count, n_samples]`, so each
//! score's values across all samples are contiguous.

mod dataset;

pub use dataset::{DatasetError, InteractionDataset, TaskKind};
