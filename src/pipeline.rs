//! End-to-end segmentation: optional elbow sweep, knee selection, joint clustering

use log::{info, warn};

use crate::data::{distinct_customers, RfmRecord};
use crate::elbow::{compute_wcss, ClusterRange};
use crate::error::SegmentError;
use crate::features::build_rfm_features;
use crate::knee::optimal_cluster_count;
use crate::model::{cluster_rfm_joint, KMeansSettings, Segmentation};

/// Parameters of a segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Fixed cluster count; `None` selects k from the WCSS knee
    pub n_clusters: Option<usize>,
    /// Candidate range for automatic selection
    pub range: ClusterRange,
    /// Settings of the final joint fit
    pub kmeans: KMeansSettings,
    /// Initializations per k during the elbow sweep
    pub elbow_runs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_clusters: None,
            range: ClusterRange::default(),
            kmeans: KMeansSettings::default(),
            elbow_runs: 20,
        }
    }
}

/// Immutable outcome of one pipeline invocation
#[derive(Debug, Clone)]
pub struct SegmentationRun {
    /// Cluster count actually used
    pub chosen_k: usize,
    /// `(k, wcss)` pairs when k was selected automatically
    pub wcss: Option<Vec<(usize, f64)>>,
    pub segmentation: Segmentation,
}

/// Segment an RFM table, choosing k by knee detection unless it is fixed
///
/// In automatic mode `k_max` is lowered to the number of distinct customers
/// when the population is smaller than the configured range.
pub fn run_segmentation(
    records: &[RfmRecord],
    config: &PipelineConfig,
) -> crate::Result<SegmentationRun> {
    if records.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let (chosen_k, wcss) = match config.n_clusters {
        Some(k) => (k, None),
        None => {
            let (k, curve) = select_cluster_count(records, config)?;
            (k, Some(curve))
        }
    };

    let segmentation = cluster_rfm_joint(records, chosen_k, &config.kmeans)?;
    info!("Segmentation complete with k = {chosen_k}");

    Ok(SegmentationRun {
        chosen_k,
        wcss,
        segmentation,
    })
}

fn select_cluster_count(
    records: &[RfmRecord],
    config: &PipelineConfig,
) -> crate::Result<(usize, Vec<(usize, f64)>)> {
    let customers = distinct_customers(records);
    let mut range = config.range;
    if range.k_max > customers {
        warn!(
            "Only {customers} customers: lowering k_max from {} to {customers}",
            range.k_max
        );
        range.k_max = customers;
    }
    if range.k_min > range.k_max {
        return Err(SegmentError::TooFewCustomers {
            k_min: range.k_min,
            customers,
        });
    }

    let features = build_rfm_features(records)?;
    let sweep = config.kmeans.clone().with_runs(config.elbow_runs);
    let wcss = compute_wcss(&features.standardized, range, &sweep)?;
    let k = optimal_cluster_count(&wcss, range)?;

    info!("Knee detection selected k = {k} from [{}, {}]", range.k_min, range.k_max);
    Ok((k, range.iter().zip(wcss).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three behavioural groups: loyal, occasional, lapsed
    fn records() -> Vec<RfmRecord> {
        let mut records = Vec::new();
        for i in 0..6i64 {
            let step = i as f64;
            records.push(RfmRecord::new(
                format!("loyal-{i}"),
                1 + i,
                20 + i as u64,
                2000.0 + 50.0 * step,
            ));
            records.push(RfmRecord::new(format!("casual-{i}"), 40 + i, 4, 300.0 + 10.0 * step));
            records.push(RfmRecord::new(format!("lapsed-{i}"), 200 + 3 * i, 1, 20.0 + step));
        }
        records
    }

    #[test]
    fn test_fixed_k_skips_elbow() {
        let config = PipelineConfig {
            n_clusters: Some(3),
            ..Default::default()
        };
        let run = run_segmentation(&records(), &config).unwrap();

        assert_eq!(run.chosen_k, 3);
        assert!(run.wcss.is_none());
        assert_eq!(run.segmentation.profile.len(), 3);
        assert_eq!(run.segmentation.customers.len(), 18);
    }

    #[test]
    fn test_automatic_k_reports_curve() {
        let run = run_segmentation(&records(), &PipelineConfig::default()).unwrap();
        let curve = run.wcss.as_ref().unwrap();

        let ks: Vec<usize> = curve.iter().map(|(k, _)| *k).collect();
        assert_eq!(ks, (2..=10).collect::<Vec<_>>());
        assert!(ClusterRange::default().iter().any(|k| k == run.chosen_k));
        assert_eq!(run.segmentation.n_clusters, run.chosen_k);
    }

    #[test]
    fn test_automatic_k_clamps_range_to_population() {
        let small: Vec<RfmRecord> = records().into_iter().take(5).collect();
        let run = run_segmentation(&small, &PipelineConfig::default()).unwrap();

        let curve = run.wcss.unwrap();
        assert_eq!(curve.last().map(|(k, _)| *k), Some(5));
        assert!(run.chosen_k >= 2 && run.chosen_k <= 5);
    }

    #[test]
    fn test_population_below_k_min() {
        let single = vec![RfmRecord::new("only", 1, 1, 1.0)];
        let result = run_segmentation(&single, &PipelineConfig::default());
        assert!(matches!(
            result,
            Err(SegmentError::TooFewCustomers { k_min: 2, customers: 1 })
        ));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("k_min = 2"), "{err}");
    }

    #[test]
    fn test_empty_input() {
        let result = run_segmentation(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(SegmentError::EmptyInput)));
    }

    #[test]
    fn test_same_seed_same_result() {
        let config = PipelineConfig::default();
        let first = run_segmentation(&records(), &config).unwrap();
        let second = run_segmentation(&records(), &config).unwrap();

        assert_eq!(first.chosen_k, second.chosen_k);
        assert_eq!(first.segmentation.customers, second.segmentation.customers);
        assert_eq!(first.segmentation.profile, second.segmentation.profile);
    }
}
