//! CSV loader for flight exports.
//!
//! Header aliasing, date parsing, airport code extraction and the metric
//! strategy live here, so the market engine only ever sees canonical
//! [`FlightRecord`]s.

use crate::capacity::seat_capacity;
use crate::config::MetricStrategy;
use crate::error::LoadError;
use crate::market::types::{FlightBatch, FlightRecord, PeriodKey};
use crate::schema::input;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static IATA_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{3})\)").expect("IATA pattern compiles"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Filters and metric choice applied while loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub strategy: MetricStrategy,
    /// Inclusive lower bound on the flight date.
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound on the flight date.
    pub end: Option<NaiveDate>,
    /// Keep only rows whose STATUS mentions "Landed".
    pub landed_only: bool,
}

/// What the loader read, kept and threw away.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub rows_read: usize,
    pub records: usize,
    pub bad_date: usize,
    pub outside_window: usize,
    pub not_landed: usize,
    pub unknown_aircraft: usize,
    pub clamped_values: usize,
    pub strategy_fallback: bool,
}

impl LoadReport {
    fn merge(&mut self, other: &LoadReport) {
        self.files += other.files;
        self.rows_read += other.rows_read;
        self.records += other.records;
        self.bad_date += other.bad_date;
        self.outside_window += other.outside_window;
        self.not_landed += other.not_landed;
        self.unknown_aircraft += other.unknown_aircraft;
        self.clamped_values += other.clamped_values;
        self.strategy_fallback |= other.strategy_fallback;
    }
}

/// Column positions resolved from a header row.
struct Headers {
    date: usize,
    from: usize,
    to: usize,
    airline: usize,
    load_factor: usize,
    seats: Option<usize>,
    month: Option<usize>,
    aircraft: Option<usize>,
    status: Option<usize>,
}

impl Headers {
    fn resolve(header: &StringRecord, origin: &str) -> Result<Self, LoadError> {
        let names: Vec<String> = header
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_uppercase())
            .collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |column: &'static str, aliases: &[&str]| {
            find(aliases).ok_or_else(|| LoadError::MissingColumn {
                origin: origin.to_string(),
                column,
                aliases: aliases.join(" | "),
            })
        };

        Ok(Self {
            date: require("DATE", input::DATE)?,
            from: require("FROM", input::FROM)?,
            to: require("TO", input::TO)?,
            airline: require("AIRLINE", input::AIRLINE)?,
            load_factor: require("LOAD FACTOR", input::LOAD_FACTOR)?,
            seats: find(input::SEATS),
            month: find(input::MONTH),
            aircraft: find(input::AIRCRAFT),
            status: find(input::STATUS),
        })
    }

    /// Seat count for a row: the SEATS cell if usable, else the aircraft
    /// capacity table. Unknown aircraft count as zero seats and are reported.
    fn seat_count(&self, row: &StringRecord, report: &mut LoadReport) -> f64 {
        if let Some(seats) = value(row, self.seats).and_then(parse_number) {
            return non_negative(seats, report);
        }
        if self.aircraft.is_none() {
            return 0.0;
        }
        match value(row, self.aircraft).and_then(seat_capacity) {
            Some(capacity) => f64::from(capacity),
            None => {
                report.unknown_aircraft += 1;
                0.0
            }
        }
    }
}

/// Parses one CSV document into canonical flight records.
///
/// `origin` names the source in errors and logs.
pub fn parse_flights(
    text: &str,
    origin: &str,
    options: &LoadOptions,
) -> Result<(Vec<FlightRecord>, LoadReport), LoadError> {
    let csv_error = |source: csv::Error| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = Headers::resolve(reader.headers().map_err(csv_error)?, origin)?;
    let rows: Vec<StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(csv_error)?;

    let mut report = LoadReport {
        files: 1,
        rows_read: rows.len(),
        ..LoadReport::default()
    };

    let strategy = match options.strategy {
        MetricStrategy::SeatsTimesLoad if headers.seats.is_none() && headers.aircraft.is_none() => {
            warn!(
                origin,
                "No seat or aircraft column; falling back to load factor as the metric"
            );
            report.strategy_fallback = true;
            MetricStrategy::LoadFactor
        }
        strategy => strategy,
    };

    let month_column = headers
        .month
        .filter(|idx| month_column_is_numeric(&rows, *idx));

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(date) = parse_date(cell(row, headers.date)) else {
            report.bad_date += 1;
            continue;
        };
        if options.start.is_some_and(|start| date < start)
            || options.end.is_some_and(|end| date > end)
        {
            report.outside_window += 1;
            continue;
        }
        if options.landed_only
            && !value(row, headers.status).is_some_and(|status| status.contains("Landed"))
        {
            report.not_landed += 1;
            continue;
        }

        let month = value(row, month_column)
            .and_then(parse_month)
            .unwrap_or_else(|| date.month());

        let from_cell = cell(row, headers.from);
        let to_cell = cell(row, headers.to);
        let from_airport = extract_iata(from_cell);
        let to_airport = extract_iata(to_cell);
        let route = build_route(from_airport.as_deref(), city_name(to_cell).as_deref());

        let load_factor = non_negative(
            parse_number(cell(row, headers.load_factor)).unwrap_or(0.0),
            &mut report,
        );
        let metric = match strategy {
            MetricStrategy::LoadFactor => load_factor,
            MetricStrategy::SeatsTimesLoad => headers.seat_count(row, &mut report) * load_factor,
        };

        records.push(FlightRecord {
            airline: value(row, Some(headers.airline)).map(str::to_string),
            route,
            from_airport,
            to_airport,
            period: PeriodKey::new(date.year(), month),
            metric,
        });
    }
    report.records = records.len();

    debug!(origin, ?report, "Parsed flight rows");
    Ok((records, report))
}

/// Reads and parses every file, concatenating their records in order.
///
/// Files ending in `.gz` are decompressed first.
#[tracing::instrument(skip_all, fields(files = paths.len()))]
pub fn load_flights<P: AsRef<Path>>(
    paths: &[P],
    options: &LoadOptions,
) -> Result<(FlightBatch, LoadReport), LoadError> {
    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for path in paths {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = read_source(path)?;
        let (mut file_records, file_report) = parse_flights(&text, &origin, options)?;

        info!(
            file = %origin,
            rows = file_report.rows_read,
            records = file_records.len(),
            "Loaded flight file"
        );
        records.append(&mut file_records);
        report.merge(&file_report);
    }

    if report.bad_date > 0 {
        warn!(rows = report.bad_date, "Rows with an unparseable DATE were dropped");
    }
    if report.unknown_aircraft > 0 {
        warn!(
            rows = report.unknown_aircraft,
            "Rows with an unknown aircraft type got zero seats"
        );
    }

    Ok((FlightBatch::new(records), report))
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    let io_error = |source: std::io::Error| LoadError::Io {
        path: path.display().to_string(),
        source,
    };

    let raw = std::fs::read(path).map_err(io_error)?;
    let bytes = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(io_error)?;
        decoded
    } else {
        raw
    };
    Ok(decode_text(bytes))
}

/// UTF-8 when valid, otherwise Latin-1 (one char per byte).
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Parses the date formats seen in flight exports; time parts are ignored.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(cell, format).ok())
                .map(|dt| dt.date())
        })
}

/// First `(XXX)` three-letter code in the cell, upper-cased.
pub fn extract_iata(cell: &str) -> Option<String> {
    IATA_CODE
        .captures(&cell.to_uppercase())
        .map(|caps| caps[1].to_string())
}

/// Upper-cased place name before any parenthesis, e.g. `"Cebu (CEB)"` → `"CEBU"`.
pub fn city_name(cell: &str) -> Option<String> {
    let name = cell.split('(').next().unwrap_or("").trim();
    (!is_placeholder(name)).then(|| name.to_uppercase())
}

/// `ORIGIN_IATA-DEST_CITY`; absent only when both parts are.
pub fn build_route(from_iata: Option<&str>, to_city: Option<&str>) -> Option<String> {
    if from_iata.is_none() && to_city.is_none() {
        return None;
    }
    Some(format!(
        "{}-{}",
        from_iata.unwrap_or_default(),
        to_city.unwrap_or_default()
    ))
}

fn month_column_is_numeric(rows: &[StringRecord], idx: usize) -> bool {
    let mut seen = false;
    for row in rows {
        let cell = cell(row, idx);
        if is_placeholder(cell) {
            continue;
        }
        if parse_month(cell).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

fn parse_month(cell: &str) -> Option<u32> {
    let value = cell.trim().parse::<f64>().ok()?;
    let in_range = value.fract() == 0.0 && (1.0..=12.0).contains(&value);
    in_range.then_some(value as u32)
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn non_negative(value: f64, report: &mut LoadReport) -> f64 {
    if value < 0.0 {
        report.clamped_values += 1;
        0.0
    } else {
        value
    }
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("").trim()
}

/// Trimmed cell at an optional column, `None` for blanks and placeholders.
fn value(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    let cell = cell(row, idx?);
    (!is_placeholder(cell)).then_some(cell)
}

fn is_placeholder(cell: &str) -> bool {
    matches!(cell, "" | "-" | "—")
}
