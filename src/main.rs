//! rfm-cluster: customer segmentation CLI using joint K-Means clustering on RFM analysis
//!
//! Loads a transaction CSV, builds the RFM table, picks the cluster count
//! (fixed or by knee detection), clusters and prints the ranked profile.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use rfm_cluster::{
    build_rfm_table, customers_frame, profile_frame, read_transactions, run_segmentation,
    write_csv, Args, SegmentationRun,
};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let start_time = Instant::now();
    let run = run_pipeline(&args)?;

    print_report(&run);
    export_tables(&args, &run)?;

    info!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Load data, build the RFM table and segment it
fn run_pipeline(args: &Args) -> Result<SegmentationRun> {
    let separator = args.separator_byte()?;
    let mapping = args.column_mapping()?;

    let transactions = read_transactions(Path::new(&args.input), separator)
        .with_context(|| format!("failed to read transactions from {}", args.input))?;
    let records =
        build_rfm_table(&transactions, &mapping).context("failed to build the RFM table")?;

    let run = run_segmentation(&records, &args.pipeline_config())
        .context("segmentation pipeline failed")?;
    Ok(run)
}

/// Print the WCSS curve (automatic mode) and the ranked cluster profile
fn print_report(run: &SegmentationRun) {
    if let Some(curve) = &run.wcss {
        println!("=== Elbow (WCSS) ===");
        for (k, wcss) in curve {
            let marker = if *k == run.chosen_k { "  <- knee" } else { "" };
            println!("k={k:>2}  WCSS={wcss:>12.4}{marker}");
        }
        println!();
    }

    let segmentation = &run.segmentation;
    println!("=== Cluster Profile (k = {}) ===", run.chosen_k);
    println!(
        "{:>4} {:>7} {:>9} {:>8} {:>11} {:>9} {:>8}",
        "Rank", "Cluster", "Customers", "Share", "Recency", "Frequency", "Score"
    );
    for p in segmentation.profile.iter().rev() {
        println!(
            "{:>4} {:>7} {:>9} {:>7.2}% {:>11.2} {:>9.2} {:>8.2}",
            p.quality_rank,
            p.cluster_id,
            p.customers,
            p.pct_of_base * 100.0,
            p.recency_mean,
            p.frequency_mean,
            p.composite_score_mean
        );
    }
    for p in segmentation.profile.iter().rev() {
        println!(
            "Cluster {}: monetary mean {:.2}, median {:.2}",
            p.cluster_id, p.monetary_mean, p.monetary_median
        );
    }

    println!(
        "\n{} customers, within-cluster sum of squares: {:.2}",
        segmentation.customers.len(),
        segmentation.inertia
    );
}

/// Write the customer and profile tables when output paths are given
fn export_tables(args: &Args, run: &SegmentationRun) -> Result<()> {
    if let Some(path) = &args.customers_out {
        let mut df = customers_frame(&run.segmentation.customers)?;
        write_csv(&mut df, Path::new(path))
            .with_context(|| format!("failed to write customers to {path}"))?;
        println!("Customer table saved to: {path}");
    }
    if let Some(path) = &args.profile_out {
        let mut df = profile_frame(&run.segmentation.profile)?;
        write_csv(&mut df, Path::new(path))
            .with_context(|| format!("failed to write profile to {path}"))?;
        println!("Cluster profile saved to: {path}");
    }
    Ok(())
}
