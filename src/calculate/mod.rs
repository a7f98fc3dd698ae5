//! Unit conversions for reported metrics.

/// Convert seconds to minutes, rounded to 2 decimal places.
///
/// A missing input stays missing.
pub fn seconds_to_minutes(seconds: Option<f64>) -> Option<f64> {
    seconds.map(|s| round_to(s / 60.0, 2))
}

/// Round to `places` decimals, breaking exact ties toward the even digit
/// (0.125 -> 0.12, 0.625 -> 0.62).
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}
