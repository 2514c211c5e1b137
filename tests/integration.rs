//! Integration tests for rfm-cluster

use std::io::Write;

use rfm_cluster::export::CUSTOMER_COLUMNS;
use rfm_cluster::{
    build_rfm_features, build_rfm_table, cluster_rfm_joint, compute_wcss, customers_frame,
    optimal_cluster_count, read_transactions, run_segmentation, ClusterRange, ColumnMapping,
    KMeansSettings, PipelineConfig, RfmRecord, SegmentError,
};
use tempfile::NamedTempFile;

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "InvoiceNo,InvoiceDate,TotalAmount,CustomerID,Status").unwrap();

    // Recent, frequent, high-value customers
    for (customer, day) in [("c1", 9), ("c2", 5), ("c3", 1)] {
        for n in 0..5 {
            writeln!(
                file,
                "{customer}-{n},2011-11-{:02}T10:00:00Z,{},{customer},paid",
                day + n * 4,
                180 + 10 * n
            )
            .unwrap();
        }
    }

    // Lapsed, one-off, low-value customers
    writeln!(file, "c4-0,2011-09-20T09:00:00Z,12.5,c4,paid").unwrap();
    writeln!(file, "c5-0,2011-09-01T09:00:00Z,9.0,c5,paid").unwrap();
    writeln!(file, "c6-0,2011-08-15T09:00:00Z,15.0,c6,paid").unwrap();
    writeln!(file, "c6-1,2011-12-01T09:00:00Z,5000.0,c6,refunded").unwrap();

    // Rows that must be dropped
    writeln!(file, "x-0,,10.0,c7,paid").unwrap();
    writeln!(file, "x-1,2011-10-01T09:00:00Z,10.0,,paid").unwrap();

    file
}

fn mapping() -> ColumnMapping {
    ColumnMapping::new("CustomerID", "InvoiceDate", "TotalAmount")
        .with_order("InvoiceNo")
        .with_status("Status", ["paid"])
}

fn scenario_records() -> Vec<RfmRecord> {
    let recency = [1, 5, 10, 50, 60, 90];
    let frequency = [10, 8, 6, 2, 1, 1];
    let monetary = [1000.0, 800.0, 600.0, 100.0, 50.0, 40.0];
    (0..6)
        .map(|i| RfmRecord::new(format!("{}", i + 1), recency[i], frequency[i], monetary[i]))
        .collect()
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let transactions = read_transactions(test_file.path(), b',').unwrap();
    let records = build_rfm_table(&transactions, &mapping()).unwrap();

    assert_eq!(records.len(), 6);
    let c6 = records.iter().find(|r| r.customer_id == "c6").unwrap();
    assert_eq!(c6.frequency, 1);
    assert_eq!(c6.monetary, 15.0);

    let config = PipelineConfig {
        n_clusters: Some(2),
        ..Default::default()
    };
    let run = run_segmentation(&records, &config).unwrap();
    let customers = &run.segmentation.customers;

    for c in customers {
        let loyal = ["c1", "c2", "c3"].contains(&c.customer_id.as_str());
        assert_eq!(c.quality_rank, usize::from(loyal), "customer {}", c.customer_id);
    }
}

#[test]
fn test_automatic_cluster_selection() {
    let test_file = create_test_csv();
    let transactions = read_transactions(test_file.path(), b',').unwrap();
    let records = build_rfm_table(&transactions, &mapping()).unwrap();

    let run = run_segmentation(&records, &PipelineConfig::default()).unwrap();
    let curve = run.wcss.unwrap();

    // range is clamped to the six customers
    assert_eq!(curve.len(), 5);
    assert!((2..=6).contains(&run.chosen_k));
    assert_eq!(run.segmentation.profile.len(), run.chosen_k);
}

#[test]
fn test_scenario_separates_best_customers() {
    let segmentation =
        cluster_rfm_joint(&scenario_records(), 2, &KMeansSettings::default()).unwrap();

    let best: Vec<&str> = segmentation
        .customers
        .iter()
        .filter(|c| c.quality_rank == 1)
        .map(|c| c.customer_id.as_str())
        .collect();
    assert_eq!(best, vec!["1", "2", "3"]);
}

#[test]
fn test_k_exceeds_population() {
    let result = cluster_rfm_joint(&scenario_records(), 8, &KMeansSettings::default());
    match result {
        Err(SegmentError::TooManyClusters { k, customers }) => {
            assert_eq!(k, 8);
            assert_eq!(customers, 6);
        }
        other => panic!("expected TooManyClusters, got {other:?}"),
    }
}

#[test]
fn test_profile_invariants() {
    let records: Vec<RfmRecord> = (0..30)
        .map(|i| {
            RfmRecord::new(
                format!("cust-{i}"),
                (i * 7 % 120) as i64,
                1 + (i * 3 % 11) as u64,
                25.0 + (i * 37 % 500) as f64,
            )
        })
        .collect();

    for k in 2..=6 {
        let segmentation = cluster_rfm_joint(&records, k, &KMeansSettings::default()).unwrap();
        let profile = &segmentation.profile;
        assert_eq!(profile.len(), k);

        let pct: f64 = profile.iter().map(|p| p.pct_of_base).sum();
        assert!((pct - 1.0).abs() <= 0.001, "k={k}: PctOfBase sums to {pct}");

        for (rank, pair) in profile.windows(2).enumerate() {
            assert_eq!(pair[0].quality_rank, rank);
            assert!(pair[0].composite_score_mean <= pair[1].composite_score_mean);
        }
        assert_eq!(profile[k - 1].quality_rank, k - 1);
    }
}

#[test]
fn test_elbow_and_knee() {
    let features = build_rfm_features(&scenario_records()).unwrap();
    let range = ClusterRange::new(2, 5);
    let settings = KMeansSettings::default().with_runs(20);

    let wcss = compute_wcss(&features.standardized, range, &settings).unwrap();
    assert_eq!(wcss.len(), 4);
    for pair in wcss.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9);
    }

    let k = optimal_cluster_count(&wcss, range).unwrap();
    assert_eq!(optimal_cluster_count(&wcss, range).unwrap(), k);
    assert!((2..=5).contains(&k));
}

#[test]
fn test_degenerate_knee() {
    let k = optimal_cluster_count(&[17.0], ClusterRange::new(5, 5)).unwrap();
    assert_eq!(k, 5);
}

#[test]
fn test_customer_table_columns() {
    let segmentation =
        cluster_rfm_joint(&scenario_records(), 3, &KMeansSettings::default()).unwrap();
    let df = customers_frame(&segmentation.customers).unwrap();
    assert_eq!(df.get_column_names(), CUSTOMER_COLUMNS.to_vec());
}
