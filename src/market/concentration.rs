//! Herfindahl-Hirschman concentration at route and airport granularity,
//! plus per-airport flight tallies.

use crate::market::aggregate::RouteKey;
use crate::market::types::{FlightRecord, PeriodKey};
use crate::market::utility::{hhi, round2, stable_sum};
use std::collections::BTreeMap;
use tracing::debug;

/// (period, route) or (period, airport).
pub type PeriodSlot = (PeriodKey, String);

/// Concentration and traffic count for one airport in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AirportStats {
    pub hhi: f64,
    pub flights: u64,
}

/// RouteHHI per (period, route) across the airlines flying it, rounded to 2.
#[tracing::instrument(skip_all, fields(groups = totals.len()))]
pub fn route_concentration(totals: &BTreeMap<RouteKey, f64>) -> BTreeMap<PeriodSlot, f64> {
    let mut by_route: BTreeMap<PeriodSlot, Vec<f64>> = BTreeMap::new();
    for ((period, route, _), value) in totals {
        by_route.entry((*period, route.clone())).or_default().push(*value);
    }

    by_route
        .into_iter()
        .map(|(slot, values)| (slot, round2(hhi(&values))))
        .collect()
}

/// Summed metric per (period, airport, airline) over every record that
/// touches the airport as origin or destination.
///
/// A record whose origin and destination are the same airport contributes
/// twice. Records without an airline cannot take a share and are left out.
pub fn airport_shares(records: &[FlightRecord]) -> BTreeMap<(PeriodKey, String, String), f64> {
    let mut groups: BTreeMap<(PeriodKey, String, String), Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(airline) = record.airline() else {
            continue;
        };
        for airport in record.endpoints() {
            groups
                .entry((record.period, airport.to_string(), airline.to_string()))
                .or_default()
                .push(record.metric);
        }
    }
    groups
        .into_iter()
        .map(|(key, values)| (key, stable_sum(&values)))
        .collect()
}

/// Number of record endpoints touching each airport per period.
///
/// Arrivals and departures are tallied together; every record with an
/// airport code counts, attributable or not.
pub fn airport_flight_counts(records: &[FlightRecord]) -> BTreeMap<PeriodSlot, u64> {
    let mut counts: BTreeMap<PeriodSlot, u64> = BTreeMap::new();
    for record in records {
        for airport in record.endpoints() {
            *counts.entry((record.period, airport.to_string())).or_default() += 1;
        }
    }
    counts
}

/// AirportHHI and flight counts for every (period, airport) seen in the input.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn airport_concentration(records: &[FlightRecord]) -> BTreeMap<PeriodSlot, AirportStats> {
    let mut by_airport: BTreeMap<PeriodSlot, Vec<f64>> = BTreeMap::new();
    for ((period, airport, _), value) in airport_shares(records) {
        by_airport.entry((period, airport)).or_default().push(value);
    }

    let stats: BTreeMap<PeriodSlot, AirportStats> = airport_flight_counts(records)
        .into_iter()
        .map(|(slot, flights)| {
            let index = by_airport
                .get(&slot)
                .map(|values| round2(hhi(values)))
                .unwrap_or(0.0);
            (slot, AirportStats { hhi: index, flights })
        })
        .collect();

    debug!(airports = stats.len(), "Airport concentration done");
    stats
}
