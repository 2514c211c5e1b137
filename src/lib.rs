//! rfm-cluster: customer segmentation from RFM (Recency, Frequency, Monetary)
//! analysis with joint K-Means clustering
//!
//! Customers are described by inverted recency, log frequency and log monetary
//! value, standardized per batch and clustered jointly. The cluster count can be
//! fixed or picked from the knee of the WCSS curve, and clusters are ranked by
//! their mean composite score.

pub mod cli;
pub mod data;
pub mod elbow;
pub mod error;
pub mod export;
pub mod features;
pub mod knee;
pub mod model;
pub mod pipeline;
pub mod profile;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{build_rfm_table, read_transactions, ColumnMapping, RfmRecord};
pub use elbow::{compute_wcss, ClusterRange};
pub use error::SegmentError;
pub use export::{customers_frame, profile_frame, write_csv};
pub use features::{build_rfm_features, RfmFeatures};
pub use knee::optimal_cluster_count;
pub use model::{cluster_rfm_joint, CustomerSegment, KMeansSettings, Segmentation};
pub use pipeline::{run_segmentation, PipelineConfig, SegmentationRun};
pub use profile::{build_cluster_profile, ClusterProfile};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, SegmentError>;
