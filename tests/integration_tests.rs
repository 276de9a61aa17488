use chrono::NaiveDate;
use route_concentration::config::MetricStrategy;
use route_concentration::market::{MarketRow, compute_market_table};
use route_concentration::output::{summarize_periods, write_rows};
use route_concentration::parser::{LoadOptions, load_flights};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample_flights.csv");

fn find<'a>(rows: &'a [MarketRow], airline: &str, route: &str, month: u32) -> &'a MarketRow {
    rows.iter()
        .find(|r| r.airline == airline && r.route == route && r.month == month)
        .unwrap_or_else(|| panic!("no row for {airline} {route} {month}"))
}

#[test]
fn test_full_pipeline() {
    let (batch, load) = load_flights(&[FIXTURE], &LoadOptions::default()).expect("Failed to load fixture");
    assert_eq!(load.files, 1);
    assert_eq!(load.rows_read, 6);
    assert_eq!(load.bad_date, 1);
    assert_eq!(batch.len(), 5);

    let table = compute_market_table(&batch).expect("Failed to compute table");
    let rows = &table.rows;
    assert_eq!(rows.len(), 4);
    assert_eq!(table.report.skipped_records, 0);
    assert_eq!(table.report.unresolved_from, 0);
    assert_eq!(table.report.unresolved_to, 0);

    let cebu_pacific = find(rows, "Cebu Pacific", "MNL-CEBU", 7);
    assert_eq!(cebu_pacific.passenger, 100.0);
    assert_eq!(cebu_pacific.own_shfli, 55.56);
    assert_eq!(cebu_pacific.route_hhi, 5555.56);
    assert_eq!(cebu_pacific.air_hhi_from, 5555.56);
    assert_eq!(cebu_pacific.air_hhi_to, 5555.56);
    assert_eq!(cebu_pacific.air_fli_from, 3);
    assert_eq!(cebu_pacific.air_fli_to, 3);

    let pal = find(rows, "Philippine Airlines", "MNL-CEBU", 7);
    assert_eq!(pal.own_shfli, 27.78);
    assert_eq!(pal.route_hhi, cebu_pacific.route_hhi);

    let cebgo = find(rows, "Cebgo", "CRK-BUTUAN", 7);
    assert_eq!(cebgo.route_hhi, 10000.0);
    assert_eq!(cebgo.air_hhi_from, 10000.0);
    assert_eq!(cebgo.air_fli_to, 1);

    let august = find(rows, "Cebu Pacific", "MNL-CEBU", 8);
    assert_eq!(august.own_shfli, 100.0);
    assert_eq!(august.air_fli_from, 1);

    // Sorted by year, month, route, airline
    let order: Vec<(u32, &str, &str)> = rows
        .iter()
        .map(|r| (r.month, r.route.as_str(), r.airline.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (7, "CRK-BUTUAN", "Cebgo"),
            (7, "MNL-CEBU", "Cebu Pacific"),
            (7, "MNL-CEBU", "Philippine Airlines"),
            (8, "MNL-CEBU", "Cebu Pacific"),
        ]
    );

    let periods = summarize_periods(rows);
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].passenger, 180.0);
    assert_eq!(periods[0].routes, 2);
}

#[test]
fn test_landed_only_and_window() {
    let options = LoadOptions {
        landed_only: true,
        start: NaiveDate::from_ymd_opt(2024, 7, 15),
        ..LoadOptions::default()
    };
    let (batch, load) = load_flights(&[FIXTURE], &options).unwrap();

    // 07-14 (two rows) fall before the window, August is only scheduled
    assert_eq!(load.outside_window, 2);
    assert_eq!(load.not_landed, 1);
    assert_eq!(batch.len(), 2);

    let table = compute_market_table(&batch).unwrap();
    let cebu_pacific = find(&table.rows, "Cebu Pacific", "MNL-CEBU", 7);
    assert_eq!(cebu_pacific.passenger, 40.0);
    assert_eq!(cebu_pacific.route_hhi, 10000.0);
}

#[test]
fn test_seats_times_load_pipeline() {
    let options = LoadOptions {
        strategy: MetricStrategy::SeatsTimesLoad,
        ..LoadOptions::default()
    };
    let (batch, load) = load_flights(&[FIXTURE], &options).unwrap();
    assert!(!load.strategy_fallback);
    assert_eq!(load.unknown_aircraft, 0);

    let table = compute_market_table(&batch).unwrap();
    assert_eq!(find(&table.rows, "Cebu Pacific", "MNL-CEBU", 7).passenger, 23000.0);
    assert_eq!(find(&table.rows, "Philippine Airlines", "MNL-CEBU", 7).passenger, 9300.0);
    assert_eq!(find(&table.rows, "Cebgo", "CRK-BUTUAN", 7).passenger, 2160.0);
}

#[test]
fn test_csv_output_from_fixture() {
    let (batch, _) = load_flights(&[FIXTURE], &LoadOptions::default()).unwrap();
    let table = compute_market_table(&batch).unwrap();

    let bytes = write_rows(Vec::new(), &table.rows).unwrap();
    let content = String::from_utf8(bytes).unwrap();
    let mut lines = content.lines();

    assert_eq!(
        lines.next(),
        Some("Airline,Route,Year,Month,Passenger,OwnShfli,RouteHHI,AirHHI_From,AirHHI_To,AirFli_From,AirFli_To")
    );
    assert_eq!(
        lines.next(),
        Some("Cebgo,CRK-BUTUAN,2024,7,30.0,16.67,10000.0,10000.0,10000.0,1,1")
    );
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = load_flights(&["/nonexistent/flights.csv"], &LoadOptions::default());
    assert!(result.is_err());
}
