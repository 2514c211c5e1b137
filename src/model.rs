//! K-Means clustering model and joint RFM segmentation

use std::collections::HashMap;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::{distinct_customers, RfmRecord};
use crate::error::SegmentError;
use crate::features::build_rfm_features;
use crate::profile::{build_cluster_profile, ClusterProfile};

/// Fitting parameters shared by every K-Means run
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansSettings {
    /// Independent k-means++ initializations; the lowest-inertia run is kept
    pub n_runs: usize,
    /// Maximum Lloyd iterations per run
    pub max_iters: u64,
    /// Convergence tolerance
    pub tolerance: f64,
    /// Seed for the initialization RNG
    pub seed: u64,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            n_runs: 10,
            max_iters: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansSettings {
    pub fn with_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Labels, centroids and inertia of one fitted partition
#[derive(Debug)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignments for training data
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

impl KMeansModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }
}

/// Fit K-Means on a feature matrix
///
/// # Arguments
/// * `features` - Standardized features (n_samples, n_features)
/// * `n_clusters` - Number of clusters, at least 2 and at most n_samples
/// * `settings` - Runs, iteration limit, tolerance and seed
pub fn fit_kmeans(
    features: &Array2<f64>,
    n_clusters: usize,
    settings: &KMeansSettings,
) -> crate::Result<KMeansModel> {
    if n_clusters < 2 {
        return Err(SegmentError::InvalidClusterCount { k: n_clusters });
    }
    if features.nrows() < n_clusters {
        return Err(SegmentError::TooManyClusters {
            k: n_clusters,
            customers: features.nrows(),
        });
    }

    let n_samples = features.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let rng = StdRng::seed_from_u64(settings.seed);
    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .n_runs(settings.n_runs.max(1))
        .max_n_iterations(settings.max_iters)
        .tolerance(settings.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(&dataset);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(features, &labels, &centroids);

    debug!("Fitted K-Means with k={n_clusters}: inertia {inertia:.4}");

    Ok(KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Compute within-cluster sum of squares (inertia)
pub fn compute_inertia(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    centroids: &Array2<f64>,
) -> f64 {
    labels
        .iter()
        .enumerate()
        .filter(|&(_, &cluster)| cluster < centroids.nrows())
        .map(|(i, &cluster)| {
            features
                .row(i)
                .iter()
                .zip(centroids.row(cluster).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}

/// Final per-customer segmentation row
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSegment {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
    pub cluster_id: usize,
    /// Rank of the customer's cluster, 0 = worst
    pub quality_rank: usize,
    /// Sum of the customer's standardized features
    pub composite_score: f64,
}

/// Customer with its raw cluster label and score, before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub record: RfmRecord,
    pub cluster_id: usize,
    pub composite_score: f64,
}

/// Result of one joint clustering run
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub n_clusters: usize,
    /// Customers in input order
    pub customers: Vec<CustomerSegment>,
    /// Cluster profiles ordered by quality rank, worst first
    pub profile: Vec<ClusterProfile>,
    /// Inertia of the fitted partition
    pub inertia: f64,
}

/// Cluster customers jointly on standardized (inverted recency, log frequency,
/// log monetary) and rank the clusters by mean composite score
///
/// # Arguments
/// * `records` - RFM table, one row per customer
/// * `n_clusters` - Number of segments, at least 2
/// * `settings` - K-Means settings; the seed makes the run reproducible
pub fn cluster_rfm_joint(
    records: &[RfmRecord],
    n_clusters: usize,
    settings: &KMeansSettings,
) -> crate::Result<Segmentation> {
    if records.is_empty() {
        return Err(SegmentError::EmptyInput);
    }
    if n_clusters < 2 {
        return Err(SegmentError::InvalidClusterCount { k: n_clusters });
    }
    let customers = distinct_customers(records);
    if n_clusters > customers {
        return Err(SegmentError::TooManyClusters {
            k: n_clusters,
            customers,
        });
    }

    let features = build_rfm_features(records)?;
    let model = fit_kmeans(&features.standardized, n_clusters, settings)?;
    let scores = features.composite_scores();
    debug!("Cluster sizes: {:?}", model.cluster_sizes());

    let scored: Vec<ScoredCustomer> = features
        .enriched
        .into_iter()
        .zip(model.labels.iter())
        .zip(scores.iter())
        .map(|((enriched, &cluster_id), &composite_score)| ScoredCustomer {
            record: enriched.record,
            cluster_id,
            composite_score,
        })
        .collect();

    let profile = build_cluster_profile(&scored)?;
    let ranks: HashMap<usize, usize> = profile
        .iter()
        .map(|p| (p.cluster_id, p.quality_rank))
        .collect();

    let customers: Vec<CustomerSegment> = scored
        .into_iter()
        .map(|s| CustomerSegment {
            quality_rank: ranks[&s.cluster_id],
            customer_id: s.record.customer_id,
            recency: s.record.recency,
            frequency: s.record.frequency,
            monetary: s.record.monetary,
            cluster_id: s.cluster_id,
            composite_score: s.composite_score,
        })
        .collect();

    info!(
        "Segmented {} customers into {} clusters (inertia {:.4})",
        customers.len(),
        n_clusters,
        model.inertia
    );

    Ok(Segmentation {
        n_clusters,
        customers,
        profile,
        inertia: model.inertia,
    })
}
