//! Output formatting and persistence for the market table.
//!
//! Writes the table as CSV (optionally gzip-compressed) and a JSON run summary.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use tracing::{debug, info};

use crate::config::MetricStrategy;
use crate::market::types::{MarketRow, PeriodKey, RunReport};
use crate::market::utility::{mean, round2, stable_sum};
use crate::parser::LoadReport;
use crate::schema;

/// Per-period overview included in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodOverview {
    pub period: String,
    pub passenger: f64,
    pub airlines: usize,
    pub routes: usize,
    pub mean_route_hhi: f64,
}

/// Everything worth keeping about one run besides the table itself.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub strategy: MetricStrategy,
    pub inputs: Vec<String>,
    pub output: String,
    pub load: LoadReport,
    pub engine: RunReport,
    pub periods: Vec<PeriodOverview>,
}

/// Logs a run summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &RunSummary) {
    debug!("{:#?}", summary);
}

/// Writes rows to `writer` as CSV, header first, in the fixed column order.
pub fn write_rows<W: Write>(writer: W, rows: &[MarketRow]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(schema::output::ALL)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV output: {}", e.error()))
}

/// Writes the market table to `path`, replacing any existing file.
///
/// With `gzip` the CSV is compressed and `.gz` is appended to the path if it
/// is not already there. Returns the path actually written.
pub fn write_table(path: &str, rows: &[MarketRow], gzip: bool) -> Result<String> {
    let path = if gzip && !path.ends_with(".gz") {
        format!("{path}.gz")
    } else {
        path.to_string()
    };
    let file = File::create(&path).with_context(|| format!("creating '{path}'"))?;

    if gzip {
        let encoder = write_rows(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?;
    } else {
        write_rows(file, rows)?;
    }

    info!(path = %path, rows = rows.len(), gzip, "Market table written");
    Ok(path)
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary(path: &str, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("writing summary '{path}'"))?;
    info!(path, "Run summary written");
    Ok(())
}

/// Totals, carrier/route counts and mean RouteHHI for each period in the table.
pub fn summarize_periods(rows: &[MarketRow]) -> Vec<PeriodOverview> {
    #[derive(Default)]
    struct Acc<'a> {
        passenger: Vec<f64>,
        airlines: BTreeSet<&'a str>,
        route_hhi: BTreeMap<&'a str, f64>,
    }

    let mut periods: BTreeMap<PeriodKey, Acc> = BTreeMap::new();
    for row in rows {
        let acc = periods.entry(row.period()).or_default();
        acc.passenger.push(row.passenger);
        acc.airlines.insert(&row.airline);
        acc.route_hhi.insert(&row.route, row.route_hhi);
    }

    periods
        .into_iter()
        .map(|(period, acc)| {
            let hhis: Vec<f64> = acc.route_hhi.values().copied().collect();
            PeriodOverview {
                period: period.to_string(),
                passenger: round2(stable_sum(&acc.passenger)),
                airlines: acc.airlines.len(),
                routes: acc.route_hhi.len(),
                mean_route_hhi: round2(mean(&hhis)),
            }
        })
        .collect()
}
