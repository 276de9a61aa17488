//! Market-concentration aggregation engine.
//!
//! Flight records are grouped per (airline, route, month), joined with
//! period-wide airline shares, route-level and airport-level
//! Herfindahl-Hirschman indices and airport flight counts, and assembled
//! into one sorted table.

pub mod aggregate;
pub mod concentration;
pub mod endpoints;
pub mod engine;
pub mod types;
pub mod utility;

pub use engine::compute_market_table;
pub use types::{Column, FlightBatch, FlightRecord, MarketRow, MarketTable, PeriodKey, RunReport};
