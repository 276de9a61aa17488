/// Sums values in ascending order so the result does not depend on input order.
pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.iter().sum()
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    stable_sum(values) / values.len() as f64
}

/// Rounds to two decimal places; exact ties go to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `part` as a percentage of `total`. Returns 0.0 unless both are positive.
pub fn share_pct(part: f64, total: f64) -> f64 {
    if total > 0.0 && part > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

/// Herfindahl-Hirschman Index on the 0-10000 scale.
///
/// Each value is converted to a percentage share of the group total and the
/// squared shares are summed. Empty and zero-sum groups yield 0.0.
pub fn hhi(values: &[f64]) -> f64 {
    let total = stable_sum(values);
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }
    let squares: Vec<f64> = values
        .iter()
        .map(|v| {
            let share = v / total * 100.0;
            share * share
        })
        .collect();
    stable_sum(&squares)
}
