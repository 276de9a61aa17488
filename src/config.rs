use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which per-flight value feeds the aggregation as `Passenger`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MetricStrategy {
    /// The raw load-factor value of each flight.
    #[default]
    LoadFactor,
    /// Seat count multiplied by load factor.
    SeatsTimesLoad,
}

/// Run settings that can be kept in a JSON file instead of passed as flags.
///
/// Stored as a plain JSON object on disk; every field is optional:
/// ```json
/// {
///   "metric": "seats-times-load",
///   "start": "2024-07-01",
///   "end": "2025-06-30",
///   "landed_only": true,
///   "gzip": false
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub metric: Option<MetricStrategy>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub landed_only: Option<bool>,
    pub gzip: Option<bool>,
}

impl RunConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("parsing config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
