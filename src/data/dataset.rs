//! User-facing dataset abstraction.
//!
//! This is the canonical input for interaction queries.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::FloatScore;

// =============================================================================
// TaskKind
// =============================================================================

/// What the gradients describe, which in turn fixes the histogram bucket
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Scalar-target regression.
    Regression,
    /// Classification with `n_classes` target classes.
    Classification { n_classes: usize },
}

impl TaskKind {
    /// Number of scores carried per sample / per tensor cell.
    ///
    /// Regression and binary classification train one score; multiclass
    /// trains one score per class.
    #[inline]
    pub fn score_count(&self) -> usize {
        match self {
            TaskKind::Regression => 1,
            TaskKind::Classification { n_classes } => {
                if *n_classes <= 2 {
                    1
                } else {
                    *n_classes
                }
            }
        }
    }

    #[inline]
    pub fn is_classification(&self) -> bool {
        matches!(self, TaskKind::Classification { .. })
    }
}

// =============================================================================
// DatasetError
// =============================================================================

/// Dataset construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("bins matrix has {got} feature rows but {expected} bin counts were given")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("{name} has {got} sample columns, expected {expected}")]
    SampleCountMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{name} has {got} score rows, expected {expected}")]
    ScoreCountMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("feature {feature} declares {bin_count} bins, which does not fit the split type")]
    BinCountTooLarge { feature: usize, bin_count: usize },

    #[error("feature {feature} sample {sample} has bin {bin}, outside [0, {bin_count})")]
    BinOutOfRange {
        feature: usize,
        sample: usize,
        bin: u32,
        bin_count: usize,
    },

    #[error("sample {sample} has negative weight {weight}")]
    NegativeWeight { sample: usize, weight: f64 },

    #[error("classification datasets must carry hessians")]
    MissingHessians,
}

// =============================================================================
// InteractionDataset
// =============================================================================

/// Binned features plus the model state interaction queries aggregate.
///
/// All inputs are validated at construction, so scoring never has to
/// re-check bin ranges in its hot loops.
///
/// # Example
///
/// ```
/// use gamboost::data::{InteractionDataset, TaskKind};
/// use ndarray::array;
///
/// // 2 features over 4 samples, each feature with 2 bins
/// let bins = array![[0u32, 1, 0, 1], [0, 0, 1, 1]];
/// let gradients = array![[0.5, -0.5, 1.0, -1.0]];
/// let ds = InteractionDataset::new(
///     TaskKind::Regression,
///     bins,
///     vec![2, 2],
///     gradients,
///     None,
///     None,
/// )
/// .unwrap();
///
/// assert_eq!(ds.n_samples(), 4);
/// assert_eq!(ds.total_weight(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct InteractionDataset {
    task: TaskKind,
    /// Binned feature values: `[n_features, n_samples]` (feature-major).
    bins: Array2<u32>,
    /// Bins per feature; bin values are in `[0, bin_counts[f])`.
    bin_counts: Vec<usize>,
    /// Gradients: `[score_count, n_samples]`.
    gradients: Array2<FloatScore>,
    /// Hessians, same shape as gradients. Present iff classification.
    hessians: Option<Array2<FloatScore>>,
    /// Sample weights; `None` means uniform unit weights.
    weights: Option<Array1<f64>>,
    /// Cached `Σ weights`, or `n_samples` when unweighted.
    total_weight: f64,
}

impl InteractionDataset {
    /// Validate and assemble a dataset.
    ///
    /// `bins` is `[n_features, n_samples]` with every value below the
    /// feature's entry in `bin_counts`. `gradients` (and `hessians`, which
    /// are required for classification) are `[score_count, n_samples]`.
    ///
    /// A weight vector that sums to zero is treated as absent: the sample
    /// count stands in for the total weight, so the weight total is
    /// strictly positive whenever any sample exists.
    pub fn new(
        task: TaskKind,
        bins: Array2<u32>,
        bin_counts: Vec<usize>,
        gradients: Array2<FloatScore>,
        hessians: Option<Array2<FloatScore>>,
        weights: Option<Array1<f64>>,
    ) -> Result<Self, DatasetError> {
        let n_features = bins.nrows();
        let n_samples = bins.ncols();
        let score_count = task.score_count();

        if bin_counts.len() != n_features {
            return Err(DatasetError::FeatureCountMismatch {
                expected: bin_counts.len(),
                got: n_features,
            });
        }
        if gradients.ncols() != n_samples {
            return Err(DatasetError::SampleCountMismatch {
                name: "gradients",
                expected: n_samples,
                got: gradients.ncols(),
            });
        }
        if gradients.nrows() != score_count {
            return Err(DatasetError::ScoreCountMismatch {
                name: "gradients",
                expected: score_count,
                got: gradients.nrows(),
            });
        }
        if task.is_classification() && hessians.is_none() {
            return Err(DatasetError::MissingHessians);
        }
        if let Some(ref h) = hessians {
            if h.ncols() != n_samples {
                return Err(DatasetError::SampleCountMismatch {
                    name: "hessians",
                    expected: n_samples,
                    got: h.ncols(),
                });
            }
            if h.nrows() != score_count {
                return Err(DatasetError::ScoreCountMismatch {
                    name: "hessians",
                    expected: score_count,
                    got: h.nrows(),
                });
            }
        }
        if let Some(ref w) = weights {
            if w.len() != n_samples {
                return Err(DatasetError::SampleCountMismatch {
                    name: "weights",
                    expected: n_samples,
                    got: w.len(),
                });
            }
        }

        for (f, &bin_count) in bin_counts.iter().enumerate() {
            if u32::try_from(bin_count).is_err() {
                return Err(DatasetError::BinCountTooLarge {
                    feature: f,
                    bin_count,
                });
            }
            for (s, &bin) in bins.row(f).iter().enumerate() {
                if bin as usize >= bin_count {
                    return Err(DatasetError::BinOutOfRange {
                        feature: f,
                        sample: s,
                        bin,
                        bin_count,
                    });
                }
            }
        }

        let weights = match weights {
            Some(w) => {
                let mut total = 0.0;
                for (s, &weight) in w.iter().enumerate() {
                    if weight < 0.0 {
                        return Err(DatasetError::NegativeWeight { sample: s, weight });
                    }
                    total += weight;
                }
                // an all-zero weight vector carries no information
                if total == 0.0 {
                    None
                } else {
                    Some(w)
                }
            }
            None => None,
        };
        let total_weight = match &weights {
            Some(w) => w.sum(),
            None => n_samples as f64,
        };

        Ok(Self {
            task,
            bins,
            bin_counts,
            gradients,
            hessians,
            weights,
            total_weight,
        })
    }

    #[inline]
    pub fn task(&self) -> TaskKind {
        self.task
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.bins.ncols()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.bins.nrows()
    }

    /// Number of scores per sample (see [`TaskKind::score_count`]).
    #[inline]
    pub fn score_count(&self) -> usize {
        self.task.score_count()
    }

    /// Number of bins feature `f` was discretized into.
    #[inline]
    pub fn bin_count(&self, f: usize) -> usize {
        self.bin_counts[f]
    }

    /// Bin of feature `f` for sample `i`.
    #[inline]
    pub fn bin(&self, f: usize, i: usize) -> u32 {
        self.bins[[f, i]]
    }

    /// Binned values of one feature across all samples.
    #[inline]
    pub fn feature_bins(&self, f: usize) -> ArrayView1<'_, u32> {
        self.bins.row(f)
    }

    #[inline]
    pub fn gradients(&self) -> ArrayView2<'_, FloatScore> {
        self.gradients.view()
    }

    #[inline]
    pub fn hessians(&self) -> Option<ArrayView2<'_, FloatScore>> {
        self.hessians.as_ref().map(|h| h.view())
    }

    /// Weight of sample `i` (1.0 when unweighted).
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        match &self.weights {
            Some(w) => w[i],
            None => 1.0,
        }
    }

    /// Total sample weight. Strictly positive when `n_samples > 0`.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_feature_dataset() -> InteractionDataset {
        let bins = array![[0u32, 1, 0, 1], [0, 0, 1, 1]];
        let gradients = array![[1.0, -1.0, 2.0, -2.0]];
        InteractionDataset::new(TaskKind::Regression, bins, vec![2, 2], gradients, None, None)
            .unwrap()
    }

    #[test]
    fn test_score_count() {
        assert_eq!(TaskKind::Regression.score_count(), 1);
        assert_eq!(TaskKind::Classification { n_classes: 2 }.score_count(), 1);
        assert_eq!(TaskKind::Classification { n_classes: 5 }.score_count(), 5);
    }

    #[test]
    fn test_basic_accessors() {
        let ds = two_feature_dataset();
        assert_eq!(ds.n_samples(), 4);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.bin_count(0), 2);
        assert_eq!(ds.bin(1, 2), 1);
        assert_eq!(ds.weight(0), 1.0);
        assert_eq!(ds.total_weight(), 4.0);
    }

    #[test]
    fn test_bin_out_of_range_rejected() {
        let bins = array![[0u32, 3]];
        let gradients = array![[1.0, -1.0]];
        let err = InteractionDataset::new(
            TaskKind::Regression,
            bins,
            vec![2],
            gradients,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::BinOutOfRange { sample: 1, .. }));
    }

    #[test]
    fn test_gradient_shape_rejected() {
        let bins = array![[0u32, 1]];
        let gradients = array![[1.0, -1.0, 0.0]];
        let err = InteractionDataset::new(
            TaskKind::Regression,
            bins,
            vec![2],
            gradients,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::SampleCountMismatch { .. }));
    }

    #[test]
    fn test_classification_requires_hessians() {
        let bins = array![[0u32, 1]];
        let gradients = array![[1.0, -1.0]];
        let err = InteractionDataset::new(
            TaskKind::Classification { n_classes: 2 },
            bins,
            vec![2],
            gradients,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::MissingHessians));
    }

    #[test]
    fn test_zero_weights_fall_back_to_counts() {
        let bins = array![[0u32, 1, 1]];
        let gradients = array![[1.0, -1.0, 0.5]];
        let ds = InteractionDataset::new(
            TaskKind::Regression,
            bins,
            vec![2],
            gradients,
            None,
            Some(array![0.0, 0.0, 0.0]),
        )
        .unwrap();
        assert_eq!(ds.total_weight(), 3.0);
        assert_eq!(ds.weight(1), 1.0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let bins = array![[0u32, 1]];
        let gradients = array![[1.0, -1.0]];
        let err = InteractionDataset::new(
            TaskKind::Regression,
            bins,
            vec![2],
            gradients,
            None,
            Some(array![1.0, -0.5]),
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::NegativeWeight { sample: 1, .. }));
    }
}
