//! Ranking every feature pair of a dataset by interaction strength.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{InteractionError, InteractionOptions, InteractionScorer};
use crate::data::InteractionDataset;
use crate::utils::Parallelism;

/// One scored feature pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairStrength {
    pub feature_a: usize,
    pub feature_b: usize,
    /// `0.0`, a non-negative finite gain, or [`ILLEGAL_GAIN`]
    /// (see [`InteractionScorer::evaluate`]).
    ///
    /// [`ILLEGAL_GAIN`]: super::ILLEGAL_GAIN
    pub strength: f64,
}

/// Score every unordered feature pair and rank them strongest-first.
///
/// Unscorable candidates (the sentinel) sort last. In parallel mode
/// each rayon worker holds its own scorer, and with it its own arena;
/// scorers are never shared across threads.
pub fn rank_pairs(
    dataset: &InteractionDataset,
    options: InteractionOptions,
    min_samples_for_child_split: i64,
    parallelism: Parallelism,
) -> Result<Vec<PairStrength>, InteractionError> {
    let n_features = dataset.n_features();
    let mut pairs = Vec::with_capacity(n_features.saturating_sub(1) * n_features / 2);
    for a in 0..n_features {
        for b in a + 1..n_features {
            pairs.push((a, b));
        }
    }

    let mut ranked: Vec<PairStrength> = if parallelism.is_parallel() {
        pairs
            .par_iter()
            .map_init(
                || InteractionScorer::new(dataset),
                |scorer, &(a, b)| -> Result<PairStrength, InteractionError> {
                    let strength =
                        scorer.evaluate(&[a, b], options, min_samples_for_child_split)?;
                    Ok(PairStrength {
                        feature_a: a,
                        feature_b: b,
                        strength,
                    })
                },
            )
            .collect::<Result<_, InteractionError>>()?
    } else {
        let mut scorer = InteractionScorer::new(dataset);
        let mut out = Vec::with_capacity(pairs.len());
        for &(a, b) in &pairs {
            let strength = scorer.evaluate(&[a, b], options, min_samples_for_child_split)?;
            out.push(PairStrength {
                feature_a: a,
                feature_b: b,
                strength,
            });
        }
        out
    };

    // strengths are never NaN, so the ordering is total in practice
    ranked.sort_by(|x, y| {
        y.strength
            .partial_cmp(&x.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}
