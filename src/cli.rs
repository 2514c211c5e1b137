//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::data::ColumnMapping;
use crate::elbow::ClusterRange;
use crate::model::KMeansSettings;
use crate::pipeline::PipelineConfig;

/// Customer segmentation CLI using joint K-Means clustering on RFM data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Field separator of the input file (',', ';' or 'tab')
    #[arg(short, long, default_value = ",")]
    pub separator: String,

    /// Customer identifier column
    #[arg(long, default_value = "CustomerID")]
    pub customer_col: String,

    /// Purchase date column
    #[arg(long, default_value = "InvoiceDate")]
    pub date_col: String,

    /// Transaction value column
    #[arg(long, default_value = "TotalAmount")]
    pub monetary_col: String,

    /// Order identifier column; frequency counts distinct orders when set
    #[arg(long)]
    pub order_col: Option<String>,

    /// Order status column
    #[arg(long)]
    pub status_col: Option<String>,

    /// Accepted status values, comma-separated (requires --status-col)
    #[arg(long, value_delimiter = ',')]
    pub accept: Vec<String>,

    /// Fixed number of clusters; chosen by knee detection when omitted
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Smallest cluster count evaluated by the elbow sweep
    #[arg(long, default_value = "2")]
    pub k_min: usize,

    /// Largest cluster count evaluated by the elbow sweep
    #[arg(long, default_value = "10")]
    pub k_max: usize,

    /// Random seed for K-Means initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// K-Means initializations per k during the elbow sweep
    #[arg(long, default_value = "20")]
    pub elbow_runs: usize,

    /// K-Means initializations for the final clustering
    #[arg(long, default_value = "10")]
    pub runs: usize,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Write the per-customer table to this CSV file
    #[arg(long)]
    pub customers_out: Option<String>,

    /// Write the cluster profile table to this CSV file
    #[arg(long)]
    pub profile_out: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the separator argument into a single byte
    pub fn separator_byte(&self) -> crate::Result<u8> {
        match self.separator.as_str() {
            "tab" | "\\t" | "\t" => Ok(b'\t'),
            s if s.len() == 1 => Ok(s.as_bytes()[0]),
            other => Err(crate::SegmentError::InvalidMapping(format!(
                "separator must be a single character or 'tab', got '{other}'"
            ))),
        }
    }

    /// Column roles selected on the command line
    pub fn column_mapping(&self) -> crate::Result<ColumnMapping> {
        if !self.accept.is_empty() && self.status_col.is_none() {
            return Err(crate::SegmentError::InvalidMapping(
                "--accept requires --status-col".to_string(),
            ));
        }

        let mut mapping =
            ColumnMapping::new(&self.customer_col, &self.date_col, &self.monetary_col);
        if let Some(order) = &self.order_col {
            mapping = mapping.with_order(order);
        }
        if let Some(status) = &self.status_col {
            mapping = mapping.with_status(status, self.accept.iter().cloned());
        }
        Ok(mapping)
    }

    /// Pipeline parameters selected on the command line
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            n_clusters: self.clusters,
            range: ClusterRange::new(self.k_min, self.k_max),
            kmeans: KMeansSettings {
                n_runs: self.runs,
                max_iters: self.max_iters,
                tolerance: self.tolerance,
                seed: self.seed,
            },
            elbow_runs: self.elbow_runs,
        }
    }
}
