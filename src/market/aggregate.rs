use crate::market::types::{FlightRecord, PeriodKey};
use crate::market::utility::{round2, share_pct, stable_sum};
use std::collections::BTreeMap;
use tracing::debug;

/// (period, route, airline). Ordering matches the final table's sort order.
pub type RouteKey = (PeriodKey, String, String);

/// Summed metric per (airline, route, period) plus what had to be left out.
#[derive(Debug, Default)]
pub struct RouteAggregation {
    pub totals: BTreeMap<RouteKey, f64>,
    pub skipped_records: usize,
    pub missing_airline: usize,
    pub missing_route: usize,
}

/// Sums the metric of every record into its (airline, route, period) group.
///
/// Airline and route are matched as exact strings. Records without one of
/// them cannot be attributed and are skipped; a record missing both counts
/// once in `skipped_records` and once in each missing counter.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn aggregate_routes(records: &[FlightRecord]) -> RouteAggregation {
    let mut groups: BTreeMap<RouteKey, Vec<f64>> = BTreeMap::new();
    let mut aggregation = RouteAggregation::default();

    for record in records {
        let (Some(airline), Some(route)) = (record.airline(), record.route()) else {
            aggregation.skipped_records += 1;
            if record.airline().is_none() {
                aggregation.missing_airline += 1;
            }
            if record.route().is_none() {
                aggregation.missing_route += 1;
            }
            continue;
        };

        groups
            .entry((record.period, route.to_string(), airline.to_string()))
            .or_default()
            .push(record.metric);
    }

    aggregation.totals = groups
        .into_iter()
        .map(|(key, values)| (key, stable_sum(&values)))
        .collect();

    debug!(
        groups = aggregation.totals.len(),
        skipped = aggregation.skipped_records,
        "Route-period aggregation done"
    );
    aggregation
}

/// Airline-period and period-wide traffic totals used for `OwnShfli`.
#[derive(Debug, Default)]
pub struct PeriodShares {
    pub airline_totals: BTreeMap<(PeriodKey, String), f64>,
    pub period_totals: BTreeMap<PeriodKey, f64>,
}

impl PeriodShares {
    pub fn from_totals(totals: &BTreeMap<RouteKey, f64>) -> Self {
        let mut by_airline: BTreeMap<(PeriodKey, String), Vec<f64>> = BTreeMap::new();
        let mut by_period: BTreeMap<PeriodKey, Vec<f64>> = BTreeMap::new();

        for ((period, _, airline), value) in totals {
            by_airline
                .entry((*period, airline.clone()))
                .or_default()
                .push(*value);
            by_period.entry(*period).or_default().push(*value);
        }

        Self {
            airline_totals: by_airline
                .into_iter()
                .map(|(key, values)| (key, stable_sum(&values)))
                .collect(),
            period_totals: by_period
                .into_iter()
                .map(|(key, values)| (key, stable_sum(&values)))
                .collect(),
        }
    }

    /// Airline's share of all traffic in the period, in percent, rounded to 2.
    ///
    /// This is period-wide, not route-specific: every route row of the
    /// airline in that period carries the same value.
    pub fn own_share(&self, period: PeriodKey, airline: &str) -> f64 {
        let airline_total = self
            .airline_totals
            .get(&(period, airline.to_string()))
            .copied()
            .unwrap_or(0.0);
        let period_total = self.period_totals.get(&period).copied().unwrap_or(0.0);
        round2(share_pct(airline_total, period_total))
    }
}
