//! Within-cluster sum of squares over a range of cluster counts

use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::SegmentError;
use crate::model::{fit_kmeans, KMeansSettings};

/// Inclusive range of candidate cluster counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRange {
    pub k_min: usize,
    pub k_max: usize,
}

impl Default for ClusterRange {
    fn default() -> Self {
        Self { k_min: 2, k_max: 10 }
    }
}

impl ClusterRange {
    pub fn new(k_min: usize, k_max: usize) -> Self {
        Self { k_min, k_max }
    }

    /// Number of candidate k values
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.k_max - self.k_min + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.k_min > self.k_max
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.k_min..=self.k_max
    }

    /// Check `2 <= k_min <= k_max <= n_samples`
    pub fn validate(&self, n_samples: usize) -> crate::Result<()> {
        if self.k_min < 2 || self.k_min > self.k_max {
            return Err(SegmentError::InvalidRange {
                k_min: self.k_min,
                k_max: self.k_max,
            });
        }
        if self.k_max > n_samples {
            return Err(SegmentError::RangeExceedsPopulation {
                k_max: self.k_max,
                customers: n_samples,
            });
        }
        Ok(())
    }
}

/// Compute K-Means inertia for every k in `range`, in ascending k order
///
/// Each k is fit independently with `settings.n_runs` k-means++
/// initializations and the same seed, so the fits run in parallel.
pub fn compute_wcss(
    features: &Array2<f64>,
    range: ClusterRange,
    settings: &KMeansSettings,
) -> crate::Result<Vec<f64>> {
    range.validate(features.nrows())?;

    info!(
        "Computing WCSS for k in [{}, {}] with {} initializations each",
        range.k_min, range.k_max, settings.n_runs
    );

    let wcss = (range.k_min..=range.k_max)
        .into_par_iter()
        .map(|k| fit_kmeans(features, k, settings).map(|model| model.inertia))
        .collect::<crate::Result<Vec<f64>>>()?;

    for (k, inertia) in range.iter().zip(&wcss) {
        debug!("k={k}: WCSS {inertia:.4}");
    }

    Ok(wcss)
}
