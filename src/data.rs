//! Transaction loading and RFM table construction using Polars

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;

use crate::error::SegmentError;

// Internal column names of the normalized transaction frame
const CUSTOMER: &str = "customer";
const PURCHASED_AT: &str = "purchased_at";
const AMOUNT: &str = "amount";
const ORDER: &str = "order";
const LAST_PURCHASE: &str = "last_purchase";
const FREQUENCY: &str = "frequency";
const MONETARY: &str = "monetary";

/// Naive date-time layouts tried after RFC 3339
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Per-customer Recency / Frequency / Monetary metrics
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    /// Customer identifier
    pub customer_id: String,
    /// Days between the customer's last purchase and the reference date
    pub recency: i64,
    /// Distinct orders (or transactions when no order column is mapped)
    pub frequency: u64,
    /// Summed transaction value
    pub monetary: f64,
}

impl RfmRecord {
    pub fn new(
        customer_id: impl Into<String>,
        recency: i64,
        frequency: u64,
        monetary: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            recency,
            frequency,
            monetary,
        }
    }
}

/// Roles of the columns in a transaction dataset, chosen by the caller
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    /// Customer identifier column
    pub customer: String,
    /// Purchase date column
    pub date: String,
    /// Transaction value column
    pub monetary: String,
    /// Order identifier column; frequency counts rows when absent
    pub order: Option<String>,
    /// Order status column
    pub status: Option<String>,
    /// Status values kept when `status` is set; empty keeps every row
    pub accepted_status: Vec<String>,
}

impl ColumnMapping {
    pub fn new(
        customer: impl Into<String>,
        date: impl Into<String>,
        monetary: impl Into<String>,
    ) -> Self {
        Self {
            customer: customer.into(),
            date: date.into(),
            monetary: monetary.into(),
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_status<I, S>(mut self, status: impl Into<String>, accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = Some(status.into());
        self.accepted_status = accepted.into_iter().map(Into::into).collect();
        self
    }
}

/// Count distinct customer identifiers in an RFM table
pub fn distinct_customers(records: &[RfmRecord]) -> usize {
    records
        .iter()
        .map(|r| r.customer_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Read a delimited transaction file with every column kept as a string
///
/// # Arguments
/// * `file_path` - Path to the CSV file
/// * `separator` - Field separator byte (`,`, `;` or `\t`)
pub fn read_transactions(file_path: &Path, separator: u8) -> crate::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(separator))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;

    info!(
        "Loaded {} transactions with {} columns from {}",
        df.height(),
        df.width(),
        file_path.display()
    );
    Ok(df)
}

/// Aggregate raw transactions into one RFM record per customer
///
/// Rows with a missing customer or an unparseable date are dropped, the
/// optional status filter is applied, and non-numeric amounts count as zero.
/// Recency is measured against the most recent purchase in the whole dataset.
pub fn build_rfm_table(df: &DataFrame, mapping: &ColumnMapping) -> crate::Result<Vec<RfmRecord>> {
    if !mapping.accepted_status.is_empty() && mapping.status.is_none() {
        return Err(SegmentError::InvalidMapping(
            "accepted status values require a status column".to_string(),
        ));
    }

    let customers = string_column(df, &mapping.customer)?;
    let dates = string_column(df, &mapping.date)?;
    let amounts = string_column(df, &mapping.monetary)?;
    let orders = mapping
        .order
        .as_deref()
        .map(|name| string_column(df, name))
        .transpose()?;
    let statuses = match (&mapping.status, mapping.accepted_status.is_empty()) {
        (Some(name), false) => Some(string_column(df, name)?),
        _ => None,
    };
    let accepted: HashSet<&str> = mapping.accepted_status.iter().map(String::as_str).collect();

    let customer_ca = customers.str()?;
    let date_ca = dates.str()?;
    let amount_ca = amounts.str()?;
    let order_ca = orders.as_ref().map(|s| s.str()).transpose()?;
    let status_ca = statuses.as_ref().map(|s| s.str()).transpose()?;

    let mut kept_customers = Vec::with_capacity(df.height());
    let mut kept_timestamps = Vec::with_capacity(df.height());
    let mut kept_amounts = Vec::with_capacity(df.height());
    let mut kept_orders: Vec<Option<String>> = Vec::new();
    let mut dropped = 0usize;

    for idx in 0..df.height() {
        let customer = customer_ca.get(idx).filter(|c| !c.is_empty());
        let purchased_at = date_ca.get(idx).and_then(parse_timestamp);
        let (Some(customer), Some(purchased_at)) = (customer, purchased_at) else {
            dropped += 1;
            continue;
        };

        if let Some(status_ca) = status_ca {
            let status = status_ca.get(idx).unwrap_or_default();
            if !accepted.contains(status) {
                continue;
            }
        }

        let amount = amount_ca
            .get(idx)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        kept_customers.push(customer.to_string());
        kept_timestamps.push(purchased_at.and_utc().timestamp_millis());
        kept_amounts.push(amount);
        if let Some(order_ca) = order_ca {
            kept_orders.push(order_ca.get(idx).map(str::to_string));
        }
    }

    if dropped > 0 {
        warn!("Dropped {dropped} transactions with a missing customer or unparseable date");
    }
    if kept_customers.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let mut transactions = DataFrame::new(vec![
        Series::new(CUSTOMER, kept_customers),
        Series::new(PURCHASED_AT, kept_timestamps),
        Series::new(AMOUNT, kept_amounts),
    ])?;
    if orders.is_some() {
        transactions.with_column(Series::new(ORDER, kept_orders))?;
    }

    let rfm_df = aggregate_rfm(transactions, orders.is_some())?;
    let records = collect_records(&rfm_df)?;

    info!("Built RFM table with {} customers", records.len());
    Ok(records)
}

/// Group transactions by customer: last purchase, frequency and total spend
fn aggregate_rfm(transactions: DataFrame, has_orders: bool) -> crate::Result<DataFrame> {
    let frequency = if has_orders {
        col(ORDER).drop_nulls().n_unique()
    } else {
        col(PURCHASED_AT).count()
    };

    let rfm_df = transactions
        .lazy()
        .group_by([col(CUSTOMER)])
        .agg([
            col(PURCHASED_AT).max().alias(LAST_PURCHASE),
            frequency.cast(DataType::Int64).alias(FREQUENCY),
            col(AMOUNT).sum().alias(MONETARY),
        ])
        .sort([CUSTOMER], SortMultipleOptions::default())
        .collect()?;

    Ok(rfm_df)
}

/// Convert the aggregated frame into records, computing recency in days
fn collect_records(rfm_df: &DataFrame) -> crate::Result<Vec<RfmRecord>> {
    let ids = rfm_df.column(CUSTOMER)?.str()?;
    let last_purchase = rfm_df.column(LAST_PURCHASE)?.i64()?;
    let frequency = rfm_df.column(FREQUENCY)?.i64()?;
    let monetary = rfm_df.column(MONETARY)?.f64()?;

    let reference = last_purchase.max().ok_or(SegmentError::EmptyInput)?;
    debug!("Recency reference timestamp: {reference} ms");

    let records = ids
        .into_iter()
        .zip(last_purchase)
        .zip(frequency)
        .zip(monetary)
        .filter_map(|(((id, last), freq), money)| {
            let last = last?;
            Some(RfmRecord {
                customer_id: id?.to_string(),
                recency: Duration::milliseconds(reference - last).num_days(),
                frequency: freq.unwrap_or(0).max(0) as u64,
                monetary: money.unwrap_or(0.0),
            })
        })
        .collect();

    Ok(records)
}

/// Fetch a column by name as a string series
fn string_column(df: &DataFrame, name: &str) -> crate::Result<Series> {
    let column = df.column(name).map_err(|_| SegmentError::MissingColumn {
        name: name.to_string(),
    })?;
    Ok(column.cast(&DataType::String)?)
}

/// Parse a purchase date, accepting RFC 3339 and a handful of common layouts
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
