//! RFM feature engineering and standardization

use log::debug;
use ndarray::{Array1, Array2, Axis};

use crate::data::RfmRecord;
use crate::error::SegmentError;

/// Number of derived feature columns
pub const N_FEATURES: usize = 3;

/// RFM record extended with its derived features
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: RfmRecord,
    /// `-recency`, so larger is better like the other two features
    pub inverted_recency: f64,
    /// `ln(1 + frequency)`
    pub log_frequency: f64,
    /// `ln(1 + monetary)`
    pub log_monetary: f64,
}

impl EnrichedRecord {
    fn from_record(record: &RfmRecord) -> Self {
        Self {
            record: record.clone(),
            inverted_recency: -(record.recency as f64),
            log_frequency: (record.frequency as f64).ln_1p(),
            log_monetary: record.monetary.ln_1p(),
        }
    }

    fn feature_row(&self) -> [f64; N_FEATURES] {
        [self.inverted_recency, self.log_frequency, self.log_monetary]
    }
}

/// Standardized feature matrix together with the enriched table it came from
#[derive(Debug, Clone)]
pub struct RfmFeatures {
    /// Z-scored features (n_customers, 3), row order matches `enriched`
    pub standardized: Array2<f64>,
    pub enriched: Vec<EnrichedRecord>,
}

impl RfmFeatures {
    /// Per-customer sum of the standardized features
    pub fn composite_scores(&self) -> Array1<f64> {
        self.standardized.sum_axis(Axis(1))
    }
}

/// Column-wise z-score scaler, fit on a single batch and then discarded
#[derive(Debug, Clone)]
struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Population standard deviation; constant columns are only centred
    fn fit(features: &Array2<f64>) -> crate::Result<Self> {
        let mean = features.mean_axis(Axis(0)).ok_or(SegmentError::EmptyInput)?;
        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > f64::EPSILON { std } else { 1.0 });
        Ok(Self { mean, scale })
    }

    fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        (features - &self.mean) / &self.scale
    }
}

/// Build inverted-recency / log-frequency / log-monetary features and
/// standardize them over the given batch of customers
pub fn build_rfm_features(records: &[RfmRecord]) -> crate::Result<RfmFeatures> {
    if records.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let enriched: Vec<EnrichedRecord> = records.iter().map(EnrichedRecord::from_record).collect();

    let raw: Vec<f64> = enriched.iter().flat_map(EnrichedRecord::feature_row).collect();
    let raw_features = Array2::from_shape_vec((enriched.len(), N_FEATURES), raw)?;

    let scaler = StandardScaler::fit(&raw_features)?;
    let standardized = scaler.transform(&raw_features);

    debug!(
        "Standardized {} customers (means {:?}, scales {:?})",
        enriched.len(),
        scaler.mean.to_vec(),
        scaler.scale.to_vec()
    );

    Ok(RfmFeatures {
        standardized,
        enriched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<RfmRecord> {
        vec![
            RfmRecord::new("1", 1, 10, 1000.0),
            RfmRecord::new("2", 5, 8, 800.0),
            RfmRecord::new("3", 10, 6, 600.0),
            RfmRecord::new("4", 50, 2, 100.0),
            RfmRecord::new("5", 60, 1, 50.0),
            RfmRecord::new("6", 90, 1, 40.0),
        ]
    }

    #[test]
    fn test_derived_features() {
        let features = build_rfm_features(&sample_records()).unwrap();
        let first = &features.enriched[0];

        assert_eq!(first.inverted_recency, -1.0);
        assert!((first.log_frequency - 11.0_f64.ln()).abs() < 1e-12);
        assert!((first.log_monetary - 1001.0_f64.ln()).abs() < 1e-12);
        assert_eq!(first.record, sample_records()[0]);
    }

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_variance() {
        let features = build_rfm_features(&sample_records()).unwrap();
        assert_eq!(features.standardized.shape(), &[6, 3]);

        let means = features.standardized.mean_axis(Axis(0)).unwrap();
        let stds = features.standardized.std_axis(Axis(0), 0.0);
        for j in 0..N_FEATURES {
            assert!(means[j].abs() < 1e-10, "column {j} mean {}", means[j]);
            assert!((stds[j] - 1.0).abs() < 1e-10, "column {j} std {}", stds[j]);
        }
    }

    #[test]
    fn test_ordering_is_preserved() {
        let features = build_rfm_features(&sample_records()).unwrap();
        // customers are listed best to worst on every dimension
        for j in 0..N_FEATURES {
            let column = features.standardized.column(j);
            for i in 1..column.len() {
                assert!(column[i - 1] >= column[i]);
            }
        }
    }

    #[test]
    fn test_constant_column_is_centred() {
        let records = vec![
            RfmRecord::new("a", 3, 2, 10.0),
            RfmRecord::new("b", 3, 4, 20.0),
        ];
        let features = build_rfm_features(&records).unwrap();
        assert_eq!(features.standardized[[0, 0]], 0.0);
        assert_eq!(features.standardized[[1, 0]], 0.0);
        assert!(features.standardized.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_composite_scores_sum_rows() {
        let features = build_rfm_features(&sample_records()).unwrap();
        let scores = features.composite_scores();
        for (i, row) in features.standardized.outer_iter().enumerate() {
            assert!((scores[i] - row.sum()).abs() < 1e-12);
        }
        assert!(scores[0] > scores[5]);
    }

    #[test]
    fn test_empty_input() {
        let result = build_rfm_features(&[]);
        assert!(matches!(result, Err(SegmentError::EmptyInput)));
    }
}
