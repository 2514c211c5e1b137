//! Tabular views of a segmentation and CSV export

use std::fs::File;
use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::model::CustomerSegment;
use crate::profile::ClusterProfile;

/// Columns of the per-customer table, in order
pub const CUSTOMER_COLUMNS: [&str; 7] = [
    "CustomerId",
    "Recency",
    "Frequency",
    "Monetary",
    "ClusterId",
    "QualityRank",
    "CompositeScore",
];

/// Columns of the per-cluster profile table, in order
pub const PROFILE_COLUMNS: [&str; 11] = [
    "ClusterId",
    "Customers",
    "RecencyMean",
    "RecencyMedian",
    "FrequencyMean",
    "FrequencyMedian",
    "MonetaryMean",
    "MonetaryMedian",
    "CompositeScoreMean",
    "QualityRank",
    "PctOfBase",
];

/// Per-customer assignment table
pub fn customers_frame(customers: &[CustomerSegment]) -> crate::Result<DataFrame> {
    let [id, recency, frequency, monetary, cluster, rank, score] = CUSTOMER_COLUMNS;

    let df = DataFrame::new(vec![
        Series::new(id, customers.iter().map(|c| c.customer_id.as_str()).collect::<Vec<_>>()),
        Series::new(recency, customers.iter().map(|c| c.recency).collect::<Vec<_>>()),
        Series::new(frequency, customers.iter().map(|c| c.frequency).collect::<Vec<_>>()),
        Series::new(monetary, customers.iter().map(|c| c.monetary).collect::<Vec<_>>()),
        Series::new(cluster, customers.iter().map(|c| c.cluster_id as u32).collect::<Vec<_>>()),
        Series::new(rank, customers.iter().map(|c| c.quality_rank as u32).collect::<Vec<_>>()),
        Series::new(score, customers.iter().map(|c| c.composite_score).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

/// Per-cluster profile table, rows ordered by quality rank
pub fn profile_frame(profile: &[ClusterProfile]) -> crate::Result<DataFrame> {
    let [cluster, count, r_mean, r_median, f_mean, f_median, m_mean, m_median, score, rank, pct] =
        PROFILE_COLUMNS;
    let column = |name: &str, get: fn(&ClusterProfile) -> f64| {
        Series::new(name, profile.iter().map(get).collect::<Vec<_>>())
    };

    let df = DataFrame::new(vec![
        Series::new(cluster, profile.iter().map(|p| p.cluster_id as u32).collect::<Vec<_>>()),
        Series::new(count, profile.iter().map(|p| p.customers as u32).collect::<Vec<_>>()),
        column(r_mean, |p| p.recency_mean),
        column(r_median, |p| p.recency_median),
        column(f_mean, |p| p.frequency_mean),
        column(f_median, |p| p.frequency_median),
        column(m_mean, |p| p.monetary_mean),
        column(m_median, |p| p.monetary_median),
        column(score, |p| p.composite_score_mean),
        Series::new(rank, profile.iter().map(|p| p.quality_rank as u32).collect::<Vec<_>>()),
        column(pct, |p| p.pct_of_base),
    ])?;
    Ok(df)
}

/// Write a frame as comma-separated values with a header row
pub fn write_csv(df: &mut DataFrame, path: &Path) -> crate::Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
