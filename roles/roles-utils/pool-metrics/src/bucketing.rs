//! Step selection for Prometheus range queries.
//!
//! Charts want a roughly constant number of points regardless of the time
//! window. Given a range, pick the smallest "nice" step that keeps the point
//! count at or below the target:
//! - steps are human-readable units (1m, 5m, 15m, 30m, 1h, 2h, 3h, 6h, 12h, 1d)
//! - ranges are parsed from short strings like `24h` or `7d`
//!
//! ```ignore
//! use pool_metrics::bucketing::calculate_step;
//!
//! // 24-hour range with 60 target points uses 30-minute steps (48 points)
//! assert_eq!(calculate_step(0, 86400, 60), 1800);
//! ```

use thiserror::Error;

/// Nice step sizes in seconds, in ascending order.
const NICE_STEP_SIZES: &[u64] = &[60, 300, 900, 1800, 3600, 7200, 10800, 21600, 43200, 86400];

/// Longest range a chart may request (90 days).
pub const MAX_RANGE_SECS: u64 = 90 * 86400;

/// Points per chart the dashboard aims for.
pub const DEFAULT_TARGET_POINTS: u64 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Empty range")]
    Empty,

    #[error("Invalid range: {0}")]
    Invalid(String),

    #[error("Unknown range unit: {0}")]
    UnknownUnit(char),

    #[error("Range of {0} seconds exceeds the maximum of {MAX_RANGE_SECS} seconds")]
    TooLarge(u64),
}

/// Calculate the range-query step for a time range.
///
/// Returns the smallest entry of the nice-size ladder that is
/// `>= (to - from) / target_points`, or the largest entry when the ideal
/// step exceeds them all. Degenerate inputs fall back to one minute.
pub fn calculate_step(from_timestamp: u64, to_timestamp: u64, target_points: u64) -> u64 {
    if target_points == 0 {
        return NICE_STEP_SIZES[0];
    }

    let time_range = to_timestamp.saturating_sub(from_timestamp);
    if time_range == 0 {
        return NICE_STEP_SIZES[0];
    }

    let ideal_step = time_range / target_points;

    NICE_STEP_SIZES
        .iter()
        .find(|&&size| size >= ideal_step)
        .copied()
        .unwrap_or(NICE_STEP_SIZES[NICE_STEP_SIZES.len() - 1])
}

/// Parse a range such as `90s`, `15m`, `24h` or `7d` into seconds.
/// A bare number is taken as seconds.
pub fn parse_range(input: &str) -> Result<u64, RangeError> {
    let input = input.trim();
    let last = input.chars().last().ok_or(RangeError::Empty)?;

    let (digits, multiplier) = if last.is_ascii_digit() {
        (input, 1)
    } else {
        let multiplier = match last.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 7 * 86400,
            other => return Err(RangeError::UnknownUnit(other)),
        };
        (&input[..input.len() - last.len_utf8()], multiplier)
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| RangeError::Invalid(input.to_string()))?;
    if value == 0 {
        return Err(RangeError::Invalid(input.to_string()));
    }

    let seconds = value
        .checked_mul(multiplier)
        .ok_or_else(|| RangeError::Invalid(input.to_string()))?;
    if seconds > MAX_RANGE_SECS {
        return Err(RangeError::TooLarge(seconds));
    }

    Ok(seconds)
}
