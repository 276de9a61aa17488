//! CLI entry point for the route concentration tool.
//!
//! Loads flight CSV exports, computes per-(airline, route, month) passenger
//! load, airline shares and route/airport HHI, and writes the result as CSV.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use route_concentration::{
    config::{MetricStrategy, RunConfig},
    market::{FlightBatch, compute_market_table, utility::{hhi, round2}},
    output::{RunSummary, print_pretty, summarize_periods, write_summary, write_table},
    parser::{LoadOptions, LoadReport, load_flights},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_concentration")]
#[command(about = "Airline route market-concentration metrics from flight records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the per-airline, per-route monthly market table
    Compute {
        /// Flight CSV files (plain or .gz)
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// CSV file to write the table to
        #[arg(short, long, default_value = "final_routes_monthly_with_hhi.csv")]
        output: String,

        /// Metric aggregated as Passenger
        #[arg(short, long, value_enum)]
        metric: Option<MetricStrategy>,

        /// Drop flights before this date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Drop flights after this date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Only keep flights whose status says "Landed"
        #[arg(long, default_value_t = false)]
        landed_only: bool,

        /// Gzip compress the output CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: write a JSON run summary to this path
        #[arg(long)]
        summary: Option<String>,

        /// Optional: JSON config file with defaults for the flags above
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Print the Herfindahl-Hirschman Index of a set of values to stdout
    Hhi {
        #[arg(value_name = "VALUE", required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/route_concentration.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_concentration.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            inputs,
            output,
            metric,
            start,
            end,
            landed_only,
            gzip,
            summary,
            config,
        } => {
            let config = match config {
                Some(path) => RunConfig::load(&path)?,
                None => RunConfig::default(),
            };
            let options = LoadOptions {
                strategy: metric.or(config.metric).unwrap_or_default(),
                start: start.or(config.start),
                end: end.or(config.end),
                landed_only: landed_only || config.landed_only.unwrap_or(false),
            };
            let gzip = gzip || config.gzip.unwrap_or(false);

            compute(&inputs, &output, &options, gzip, summary.as_deref())?;
        }
        Commands::Hhi { values } => {
            if values.iter().any(|v| *v < 0.0) {
                warn!("Negative values make the index meaningless");
            }
            let index = round2(hhi(&values));
            info!(values = values.len(), hhi = index, "Herfindahl-Hirschman Index");
            println!("{index}");
        }
    }

    Ok(())
}

/// Loads the inputs, runs the market engine and writes the table (and
/// optionally the run summary).
#[tracing::instrument(skip_all, fields(inputs = inputs.len(), output = %output, strategy = ?options.strategy))]
fn compute(
    inputs: &[PathBuf],
    output: &str,
    options: &LoadOptions,
    gzip: bool,
    summary_path: Option<&str>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (options.start, options.end) {
        if start > end {
            anyhow::bail!("--start {start} is after --end {end}");
        }
    }

    let (batch, load_report): (FlightBatch, LoadReport) = load_flights(inputs, options)?;
    info!(
        files = load_report.files,
        rows = load_report.rows_read,
        records = batch.len(),
        "Flight records loaded"
    );

    let table = compute_market_table(&batch)?;
    let written = write_table(output, &table.rows, gzip)?;

    let summary = RunSummary {
        generated_at: Utc::now(),
        strategy: options.strategy,
        inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
        output: written,
        load: load_report,
        engine: table.report,
        periods: summarize_periods(&table.rows),
    };
    print_pretty(&summary);

    if let Some(path) = summary_path {
        write_summary(path, &summary)?;
    }

    info!(
        rows = summary.engine.market_rows,
        periods = summary.periods.len(),
        "Finished computing market table"
    );
    Ok(())
}
