//! Error types for the segmentation pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("No customers to segment: at least one RFM record is required")]
    EmptyInput,

    #[error("Cluster count must be at least 2, got {k}")]
    InvalidClusterCount { k: usize },

    #[error("Cluster count k = {k} exceeds the number of distinct customers ({customers})")]
    TooManyClusters { k: usize, customers: usize },

    #[error("Invalid cluster range [{k_min}, {k_max}]: requires 2 <= k_min <= k_max")]
    InvalidRange { k_min: usize, k_max: usize },

    #[error("Upper bound k_max = {k_max} exceeds the number of customers ({customers})")]
    RangeExceedsPopulation { k_max: usize, customers: usize },

    #[error("Lower bound k_min = {k_min} exceeds the number of customers ({customers})")]
    TooFewCustomers { k_min: usize, customers: usize },

    #[error("WCSS sequence has {actual} values but range [{k_min}, {k_max}] needs {expected}")]
    WcssLengthMismatch {
        k_min: usize,
        k_max: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column '{name}' not found in transaction data")]
    MissingColumn { name: String },

    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("K-Means error: {0}")]
    KMeans(#[from] linfa_clustering::KMeansError),

    #[error("Data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
