//! Kaspa unit conversions.

/// 1 KAS = 10^8 sompi.
pub const SOMPI_PER_KAS: u64 = 100_000_000;

/// Convert sompi to KAS for display.
pub fn sompi_to_kas(sompi: u64) -> f64 {
    sompi as f64 / SOMPI_PER_KAS as f64
}

/// Convert a KAS amount to sompi, rounding to the nearest unit.
///
/// Negative and non-finite inputs map to zero; values beyond `u64::MAX`
/// sompi saturate.
pub fn kas_to_sompi(kas: f64) -> u64 {
    if !kas.is_finite() || kas <= 0.0 {
        return 0;
    }
    // `as` saturates for out-of-range floats
    (kas * SOMPI_PER_KAS as f64).round() as u64
}
