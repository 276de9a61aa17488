use crate::error::EngineError;
use crate::market::aggregate::{PeriodShares, aggregate_routes};
use crate::market::concentration::{AirportStats, PeriodSlot, airport_concentration, route_concentration};
use crate::market::endpoints::RouteEndpointMap;
use crate::market::types::{FlightBatch, MarketRow, MarketTable, PeriodKey, RunReport};
use std::collections::BTreeMap;
use std::thread;
use tracing::{info, warn};

/// Turns a flight batch into the per-(airline, route, period) market table.
///
/// Fails only when the batch lacks a required column. Unattributable rows
/// are skipped and unresolved endpoints default to zero; both are counted in
/// the returned [`RunReport`]. Rows come out sorted by year, month, route,
/// airline.
#[tracing::instrument(skip_all, fields(records = batch.len()))]
pub fn compute_market_table(batch: &FlightBatch) -> Result<MarketTable, EngineError> {
    batch.validate()?;
    let records = batch.records.as_slice();

    // Airport stage reads only the raw records, so it runs beside the route stages.
    let (routes, airports) = thread::scope(|scope| {
        let airports = scope.spawn(|| airport_concentration(records));
        let routes = aggregate_routes(records);
        (routes, airports.join())
    });
    let airports = airports.map_err(|_| EngineError::Worker("airport concentration"))?;

    let shares = PeriodShares::from_totals(&routes.totals);
    let route_hhi = route_concentration(&routes.totals);
    let endpoints = RouteEndpointMap::build(records);

    let mut report = RunReport {
        input_records: records.len(),
        skipped_records: routes.skipped_records,
        missing_airline: routes.missing_airline,
        missing_route: routes.missing_route,
        ambiguous_routes: endpoints.ambiguous_routes().count(),
        ..RunReport::default()
    };

    let mut rows = Vec::with_capacity(routes.totals.len());
    for ((period, route, airline), passenger) in &routes.totals {
        let from = endpoint_stats(&airports, *period, endpoints.origin(route));
        let to = endpoint_stats(&airports, *period, endpoints.destination(route));
        if from.is_none() {
            report.unresolved_from += 1;
        }
        if to.is_none() {
            report.unresolved_to += 1;
        }
        let from = from.unwrap_or_default();
        let to = to.unwrap_or_default();

        rows.push(MarketRow {
            airline: airline.clone(),
            route: route.clone(),
            year: period.year,
            month: period.month,
            passenger: *passenger,
            own_shfli: shares.own_share(*period, airline),
            route_hhi: route_hhi
                .get(&(*period, route.clone()))
                .copied()
                .unwrap_or(0.0),
            air_hhi_from: from.hhi,
            air_hhi_to: to.hhi,
            air_fli_from: from.flights,
            air_fli_to: to.flights,
        });
    }
    report.market_rows = rows.len();

    if report.skipped_records > 0 {
        warn!(
            skipped = report.skipped_records,
            missing_airline = report.missing_airline,
            missing_route = report.missing_route,
            "Records without airline or route were left out of grouping"
        );
    }
    info!(
        rows = report.market_rows,
        periods = shares.period_totals.len(),
        unresolved_from = report.unresolved_from,
        unresolved_to = report.unresolved_to,
        "Market table assembled"
    );

    Ok(MarketTable { rows, report })
}

/// Stats for a resolved endpoint airport in the period. `None` when the
/// route has no code for that endpoint.
fn endpoint_stats(
    airports: &BTreeMap<PeriodSlot, AirportStats>,
    period: PeriodKey,
    airport: Option<&str>,
) -> Option<AirportStats> {
    let airport = airport?;
    Some(
        airports
            .get(&(period, airport.to_string()))
            .copied()
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::utility::{hhi, round2};
    use crate::market::types::{Column, FlightRecord};
    use std::collections::HashMap;

    fn flight(airline: &str, from: &str, to: &str, year: i32, month: u32, metric: f64) -> FlightRecord {
        FlightRecord::new(airline, &format!("{from}-{to}"), year, month, metric)
            .with_endpoints(Some(from), Some(to))
    }

    fn sample() -> Vec<FlightRecord> {
        vec![
            flight("A1", "MNL", "CEB", 2024, 7, 60.0),
            flight("A1", "MNL", "CEB", 2024, 7, 40.0),
            flight("A2", "MNL", "CEB", 2024, 7, 50.0),
            flight("A2", "CRK", "BSO", 2024, 7, 30.0),
            flight("A3", "MNL", "PAG", 2024, 8, 20.0),
            flight("A1", "MNL", "PAG", 2024, 8, 0.0),
        ]
    }

    fn find<'a>(table: &'a MarketTable, airline: &str, route: &str, month: u32) -> &'a MarketRow {
        table
            .rows
            .iter()
            .find(|r| r.airline == airline && r.route == route && r.month == month)
            .unwrap()
    }

    #[test]
    fn test_route_hhi_scenario() {
        let table = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let a1 = find(&table, "A1", "MNL-CEB", 7);
        let a2 = find(&table, "A2", "MNL-CEB", 7);

        assert_eq!(a1.passenger, 100.0);
        assert_eq!(a2.passenger, 50.0);
        assert_eq!(a1.route_hhi, 5555.56);
        assert_eq!(a2.route_hhi, 5555.56);
    }

    #[test]
    fn test_own_share_and_airport_fields() {
        let table = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let a1 = find(&table, "A1", "MNL-CEB", 7);

        // July total 180, A1 carries 100 of it.
        assert_eq!(a1.own_shfli, 55.56);
        // MNL in July: A1 100, A2 50; three flights touch it.
        assert_eq!(a1.air_hhi_from, 5555.56);
        assert_eq!(a1.air_fli_from, 3);
        // CEB in July: same carriers and flights as the route.
        assert_eq!(a1.air_hhi_to, 5555.56);
        assert_eq!(a1.air_fli_to, 3);

        let bso = find(&table, "A2", "CRK-BSO", 7);
        assert_eq!(bso.own_shfli, 44.44);
        assert_eq!(bso.route_hhi, 10000.0);
        assert_eq!(bso.air_fli_from, 1);
    }

    #[test]
    fn test_zero_metric_airline_has_zero_share() {
        let table = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let a1 = find(&table, "A1", "MNL-PAG", 8);
        assert_eq!(a1.own_shfli, 0.0);
        assert_eq!(a1.route_hhi, 10000.0);
        assert_eq!(find(&table, "A3", "MNL-PAG", 8).own_shfli, 100.0);
    }

    #[test]
    fn test_rows_are_sorted() {
        let mut records = sample();
        records.reverse();
        let table = compute_market_table(&FlightBatch::new(records)).unwrap();
        let keys: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.year, r.month, r.route.clone(), r.airline.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(table.rows.len(), 5);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let first = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let second = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let mut shuffled = sample();
        shuffled.rotate_left(2);
        let third = compute_market_table(&FlightBatch::new(shuffled)).unwrap();

        assert_eq!(first.rows, second.rows);
        assert_eq!(first.rows, third.rows);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_passenger_sums_match_raw_route_totals() {
        let records = sample();
        let table = compute_market_table(&FlightBatch::new(records.clone())).unwrap();

        let mut raw: HashMap<(PeriodKey, String), f64> = HashMap::new();
        for record in &records {
            *raw.entry((record.period, record.route.clone().unwrap())).or_default() += record.metric;
        }

        let mut summed: HashMap<(PeriodKey, String), f64> = HashMap::new();
        let mut passengers: HashMap<(PeriodKey, String), Vec<f64>> = HashMap::new();
        for row in &table.rows {
            let key = (row.period(), row.route.clone());
            *summed.entry(key.clone()).or_default() += row.passenger;
            passengers.entry(key).or_default().push(row.passenger);
        }

        assert_eq!(summed.len(), raw.len());
        for (key, total) in &raw {
            assert!((summed[key] - total).abs() < 1e-9);
        }
        // RouteHHI is the index of the airlines' passenger totals on that route.
        for row in &table.rows {
            let key = (row.period(), row.route.clone());
            assert_eq!(row.route_hhi, round2(hhi(&passengers[&key])));
        }
    }

    #[test]
    fn test_own_share_exact_tie_rounds_to_even() {
        let records = vec![
            flight("A1", "MNL", "CEB", 2024, 7, 1.0),
            flight("A2", "MNL", "CEB", 2024, 7, 31.0),
        ];
        let table = compute_market_table(&FlightBatch::new(records)).unwrap();

        // 1 / 32 = 3.125%, 31 / 32 = 96.875%
        assert_eq!(find(&table, "A1", "MNL-CEB", 7).own_shfli, 3.12);
        assert_eq!(find(&table, "A2", "MNL-CEB", 7).own_shfli, 96.88);
    }

    #[test]
    fn test_own_shares_sum_to_hundred_per_period() {
        let table = compute_market_table(&FlightBatch::new(sample())).unwrap();
        let mut per_period: HashMap<PeriodKey, HashMap<String, f64>> = HashMap::new();
        for row in &table.rows {
            assert!((0.0..=100.0).contains(&row.own_shfli));
            per_period
                .entry(row.period())
                .or_default()
                .insert(row.airline.clone(), row.own_shfli);
        }
        for shares in per_period.values() {
            let total: f64 = shares.values().sum();
            assert!((total - 100.0).abs() <= 0.02, "shares summed to {total}");
        }
    }

    #[test]
    fn test_unresolved_destination_defaults_to_zero() {
        let records = vec![
            FlightRecord::new("A1", "MNL-TAGBILARAN", 2024, 7, 10.0).with_endpoints(Some("MNL"), None),
            FlightRecord::new("A2", "MNL-TAGBILARAN", 2024, 7, 10.0).with_endpoints(Some("MNL"), None),
        ];
        let table = compute_market_table(&FlightBatch::new(records)).unwrap();

        for row in &table.rows {
            assert_eq!(row.air_hhi_to, 0.0);
            assert_eq!(row.air_fli_to, 0);
            assert_eq!(row.air_fli_from, 2);
            assert_eq!(row.air_hhi_from, 5000.0);
        }
        assert_eq!(table.report.unresolved_to, 2);
        assert_eq!(table.report.unresolved_from, 0);
    }

    #[test]
    fn test_skipped_records_are_reported() {
        let mut orphan = flight("A1", "MNL", "CEB", 2024, 7, 10.0);
        orphan.airline = None;
        let records = vec![orphan, flight("A2", "MNL", "CEB", 2024, 7, 10.0)];
        let table = compute_market_table(&FlightBatch::new(records)).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.report.skipped_records, 1);
        assert_eq!(table.report.missing_airline, 1);
        // The orphan still touched MNL.
        assert_eq!(table.rows[0].air_fli_from, 2);
        assert_eq!(table.rows[0].own_shfli, 100.0);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let batch = FlightBatch::with_columns(
            [Column::Airline, Column::Period, Column::Metric],
            sample(),
        );
        let err = compute_market_table(&batch).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(Column::Route)));
    }

    #[test]
    fn test_airport_columns_are_optional() {
        let batch = FlightBatch::with_columns(Column::REQUIRED, sample());
        assert!(compute_market_table(&batch).is_ok());
    }

    #[test]
    fn test_empty_batch() {
        let table = compute_market_table(&FlightBatch::new(vec![])).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.report, RunReport::default());
    }
}
