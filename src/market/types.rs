//! Data types used by the market-concentration pipeline.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::EngineError;

/// A (year, month) bucket. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// One canonical flight row, as handed over by the loader.
///
/// `airline` and `route` may be absent on individual rows; such rows are
/// excluded from grouping but still count towards airport flight tallies.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRecord {
    pub airline: Option<String>,
    pub route: Option<String>,
    pub from_airport: Option<String>,
    pub to_airport: Option<String>,
    pub period: PeriodKey,
    pub metric: f64,
}

impl FlightRecord {
    pub fn new(airline: &str, route: &str, year: i32, month: u32, metric: f64) -> Self {
        Self {
            airline: Some(airline.to_string()),
            route: Some(route.to_string()),
            from_airport: None,
            to_airport: None,
            period: PeriodKey::new(year, month),
            metric,
        }
    }

    /// Set origin and destination airport codes.
    pub fn with_endpoints(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.from_airport = from.map(str::to_string);
        self.to_airport = to.map(str::to_string);
        self
    }

    pub fn airline(&self) -> Option<&str> {
        present(self.airline.as_deref())
    }

    pub fn route(&self) -> Option<&str> {
        present(self.route.as_deref())
    }

    /// Origin and destination codes that are actually present, in that order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        [self.from_airport.as_deref(), self.to_airport.as_deref()]
            .into_iter()
            .filter_map(present)
            .map(str::trim)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Logical columns a flight source can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Airline,
    Route,
    FromAirport,
    ToAirport,
    Period,
    Metric,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Airline,
        Column::Route,
        Column::FromAirport,
        Column::ToAirport,
        Column::Period,
        Column::Metric,
    ];

    /// Columns without which no market row can be attributed.
    pub const REQUIRED: [Column; 4] = [
        Column::Airline,
        Column::Route,
        Column::Period,
        Column::Metric,
    ];
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Column::Airline => "airline",
            Column::Route => "route",
            Column::FromAirport => "from_airport",
            Column::ToAirport => "to_airport",
            Column::Period => "period",
            Column::Metric => "metric",
        };
        f.write_str(name)
    }
}

/// An immutable snapshot of flight records plus the columns its source provided.
#[derive(Debug, Clone)]
pub struct FlightBatch {
    columns: BTreeSet<Column>,
    pub records: Vec<FlightRecord>,
}

impl FlightBatch {
    /// A batch whose source carried every column.
    pub fn new(records: Vec<FlightRecord>) -> Self {
        Self {
            columns: Column::ALL.into_iter().collect(),
            records,
        }
    }

    pub fn with_columns(columns: impl IntoIterator<Item = Column>, records: Vec<FlightRecord>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            records,
        }
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Fails on the first required column the source did not provide.
    pub fn validate(&self) -> Result<(), EngineError> {
        match Column::REQUIRED.into_iter().find(|c| !self.has(*c)) {
            Some(column) => Err(EngineError::MissingColumn(column)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One row of the final table, keyed by (airline, route, period).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    #[serde(rename = "Airline")]
    pub airline: String,
    #[serde(rename = "Route")]
    pub route: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Passenger")]
    pub passenger: f64,
    #[serde(rename = "OwnShfli")]
    pub own_shfli: f64,
    #[serde(rename = "RouteHHI")]
    pub route_hhi: f64,
    #[serde(rename = "AirHHI_From")]
    pub air_hhi_from: f64,
    #[serde(rename = "AirHHI_To")]
    pub air_hhi_to: f64,
    #[serde(rename = "AirFli_From")]
    pub air_fli_from: u64,
    #[serde(rename = "AirFli_To")]
    pub air_fli_to: u64,
}

impl MarketRow {
    pub fn period(&self) -> PeriodKey {
        PeriodKey::new(self.year, self.month)
    }
}

/// Non-fatal data-quality counters gathered during one engine run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub input_records: usize,
    pub skipped_records: usize,
    pub missing_airline: usize,
    pub missing_route: usize,
    pub market_rows: usize,
    pub unresolved_from: usize,
    pub unresolved_to: usize,
    pub ambiguous_routes: usize,
}

/// Engine output: sorted rows plus the run report.
#[derive(Debug, Clone)]
pub struct MarketTable {
    pub rows: Vec<MarketRow>,
    pub report: RunReport,
}
