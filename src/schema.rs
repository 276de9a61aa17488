//! Column-name constants for flight sources and the market table.

// ── Flight source headers (upper-cased, trimmed aliases) ────────────────────
pub mod input {
    pub const DATE: &[&str] = &["DATE"];
    pub const FROM: &[&str] = &["FROM"];
    pub const TO: &[&str] = &["TO"];
    pub const AIRLINE: &[&str] = &["AIRLINE"];
    pub const LOAD_FACTOR: &[&str] = &["LOAD FACTOR", "LOAD_FACTOR", "LOADFACTOR"];
    pub const SEATS: &[&str] = &["# OF SEATS", "NO. OF SEATS", "SEATS", "NUMBER OF SEATS"];
    pub const MONTH: &[&str] = &["MONTH"];
    pub const AIRCRAFT: &[&str] = &["AIRCRAFT"];
    pub const STATUS: &[&str] = &["STATUS"];
}

// ── Market table columns, in output order ───────────────────────────────────
pub mod output {
    pub const AIRLINE: &str = "Airline";
    pub const ROUTE: &str = "Route";
    pub const YEAR: &str = "Year";
    pub const MONTH: &str = "Month";
    pub const PASSENGER: &str = "Passenger";
    pub const OWN_SHFLI: &str = "OwnShfli";
    pub const ROUTE_HHI: &str = "RouteHHI";
    pub const AIR_HHI_FROM: &str = "AirHHI_From";
    pub const AIR_HHI_TO: &str = "AirHHI_To";
    pub const AIR_FLI_FROM: &str = "AirFli_From";
    pub const AIR_FLI_TO: &str = "AirFli_To";

    pub const ALL: [&str; 11] = [
        AIRLINE,
        ROUTE,
        YEAR,
        MONTH,
        PASSENGER,
        OWN_SHFLI,
        ROUTE_HHI,
        AIR_HHI_FROM,
        AIR_HHI_TO,
        AIR_FLI_FROM,
        AIR_FLI_TO,
    ];
}
