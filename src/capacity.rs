//! Aircraft type → passenger seat capacity.
//!
//! Used by the loader when a flight row carries an aircraft type but no seat
//! count. Unknown types resolve to `None` rather than a stand-in capacity.

use regex::Regex;
use std::sync::LazyLock;

static REGISTRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("registration pattern compiles"));

/// Typical single-class seat counts per cleaned aircraft type code.
static CAPACITY: &[(&str, u32)] = &[
    ("07M", 82),
    ("32A", 186),
    ("32B", 230),
    ("32N", 186),
    ("32Q", 230),
    ("33Y", 440),
    ("73F", 130),
    ("73H", 189),
    ("74Y", 416),
    ("75F", 200),
    ("77L", 313),
    ("77W", 396),
    ("7M1", 123),
    ("A20N", 186),
    ("A21N", 230),
    ("A320", 186),
    ("A321", 230),
    ("A332", 406),
    ("A333", 440),
    ("A339", 465),
    ("A359", 440),
    ("AT4", 650),
    // ATR 72-600 seats, not the 672 that older capacity sheets carry for AT7.
    ("AT7", 72),
    ("ATR", 42),
    ("B38M", 200),
    ("B733", 140),
    ("B738", 189),
    ("B744", 416),
    ("B752", 200),
    ("B772", 313),
    ("B773", 396),
    ("B77W", 396),
    ("B788", 359),
    ("B789", 406),
    ("B78X", 440),
    ("DH8", 68),
];

/// Normalizes a raw aircraft cell such as `"A321 (RP-C9930)"` to a type code.
///
/// Parenthesised registrations are dropped, `320`/`321` become `A320`/`A321`
/// and every Dash 8 variant collapses to `DH8`. Blank and placeholder cells
/// give `None`.
pub fn clean_aircraft_type(raw: &str) -> Option<String> {
    let code = REGISTRATION.replace_all(raw, "").trim().to_uppercase();
    if code.is_empty() || code.chars().all(|c| matches!(c, '-' | '—')) {
        return None;
    }

    Some(match code.as_str() {
        "320" => "A320".to_string(),
        "321" => "A321".to_string(),
        c if c.starts_with("DH8") => "DH8".to_string(),
        _ => code,
    })
}

/// Seat capacity for a raw aircraft cell, `None` when the type is unknown.
pub fn seat_capacity(raw: &str) -> Option<u32> {
    let code = clean_aircraft_type(raw)?;
    CAPACITY
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, seats)| *seats)
}
