//! Per-cluster profiles ranked by composite score

use polars::prelude::*;

use crate::model::ScoredCustomer;

const CLUSTER: &str = "ClusterId";
const RECENCY: &str = "Recency";
const FREQUENCY: &str = "Frequency";
const MONETARY: &str = "Monetary";
const SCORE: &str = "CompositeScore";

const CUSTOMERS: &str = "Customers";
const RECENCY_MEAN: &str = "RecencyMean";
const RECENCY_MEDIAN: &str = "RecencyMedian";
const FREQUENCY_MEAN: &str = "FrequencyMean";
const FREQUENCY_MEDIAN: &str = "FrequencyMedian";
const MONETARY_MEAN: &str = "MonetaryMean";
const MONETARY_MEDIAN: &str = "MonetaryMedian";
const SCORE_MEAN: &str = "CompositeScoreMean";
const QUALITY_RANK: &str = "QualityRank";
const PCT_OF_BASE: &str = "PctOfBase";

/// Aggregated, display-rounded view of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    /// Number of customers in the cluster
    pub customers: usize,
    pub recency_mean: f64,
    pub recency_median: f64,
    pub frequency_mean: f64,
    pub frequency_median: f64,
    pub monetary_mean: f64,
    pub monetary_median: f64,
    pub composite_score_mean: f64,
    /// 0 for the lowest mean composite score, k-1 for the highest
    pub quality_rank: usize,
    /// Share of all customers, rounded to 4 decimals
    pub pct_of_base: f64,
}

/// Aggregate scored customers into one profile per cluster
///
/// Clusters are ordered by their unrounded mean composite score, worst
/// first, and that position is the quality rank. Equal scores fall back to
/// ascending cluster id. Means, medians and the score are rounded to 2
/// decimals only after ranking.
pub fn build_cluster_profile(
    customers: &[ScoredCustomer],
) -> crate::Result<Vec<ClusterProfile>> {
    let total = customers.len() as f64;
    let scored = DataFrame::new(vec![
        Series::new(CLUSTER, customers.iter().map(|c| c.cluster_id as u32).collect::<Vec<_>>()),
        Series::new(
            RECENCY,
            customers.iter().map(|c| c.record.recency as f64).collect::<Vec<_>>(),
        ),
        Series::new(
            FREQUENCY,
            customers.iter().map(|c| c.record.frequency as f64).collect::<Vec<_>>(),
        ),
        Series::new(MONETARY, customers.iter().map(|c| c.record.monetary).collect::<Vec<_>>()),
        Series::new(SCORE, customers.iter().map(|c| c.composite_score).collect::<Vec<_>>()),
    ])?;

    let profile_df = scored
        .lazy()
        .group_by([col(CLUSTER)])
        .agg([
            col(SCORE).count().cast(DataType::UInt64).alias(CUSTOMERS),
            col(RECENCY).mean().alias(RECENCY_MEAN),
            col(RECENCY).median().alias(RECENCY_MEDIAN),
            col(FREQUENCY).mean().alias(FREQUENCY_MEAN),
            col(FREQUENCY).median().alias(FREQUENCY_MEDIAN),
            col(MONETARY).mean().alias(MONETARY_MEAN),
            col(MONETARY).median().alias(MONETARY_MEDIAN),
            col(SCORE).mean().alias(SCORE_MEAN),
        ])
        .sort([SCORE_MEAN, CLUSTER], SortMultipleOptions::default())
        .with_row_index(QUALITY_RANK, None)
        .with_columns([
            col(RECENCY_MEAN).round(2),
            col(RECENCY_MEDIAN).round(2),
            col(FREQUENCY_MEAN).round(2),
            col(FREQUENCY_MEDIAN).round(2),
            col(MONETARY_MEAN).round(2),
            col(MONETARY_MEDIAN).round(2),
            col(SCORE_MEAN).round(2),
            (col(CUSTOMERS).cast(DataType::Float64) / lit(total))
                .round(4)
                .alias(PCT_OF_BASE),
        ])
        .collect()?;

    collect_profiles(&profile_df)
}

/// Read the ranked, rounded aggregate frame back into profile rows
fn collect_profiles(df: &DataFrame) -> crate::Result<Vec<ClusterProfile>> {
    let cluster_ids = usize_column(df, CLUSTER)?;
    let counts = usize_column(df, CUSTOMERS)?;
    let ranks = usize_column(df, QUALITY_RANK)?;
    let recency_mean = f64_column(df, RECENCY_MEAN)?;
    let recency_median = f64_column(df, RECENCY_MEDIAN)?;
    let frequency_mean = f64_column(df, FREQUENCY_MEAN)?;
    let frequency_median = f64_column(df, FREQUENCY_MEDIAN)?;
    let monetary_mean = f64_column(df, MONETARY_MEAN)?;
    let monetary_median = f64_column(df, MONETARY_MEDIAN)?;
    let score_mean = f64_column(df, SCORE_MEAN)?;
    let pct_of_base = f64_column(df, PCT_OF_BASE)?;

    Ok((0..df.height())
        .map(|i| ClusterProfile {
            cluster_id: cluster_ids[i],
            customers: counts[i],
            recency_mean: recency_mean[i],
            recency_median: recency_median[i],
            frequency_mean: frequency_mean[i],
            frequency_median: frequency_median[i],
            monetary_mean: monetary_mean[i],
            monetary_median: monetary_median[i],
            composite_score_mean: score_mean[i],
            quality_rank: ranks[i],
            pct_of_base: pct_of_base[i],
        })
        .collect())
}

fn usize_column(df: &DataFrame, name: &str) -> crate::Result<Vec<usize>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    Ok(column
        .u64()?
        .into_iter()
        .map(|v| v.unwrap_or_default() as usize)
        .collect())
}

fn f64_column(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}
