//! Day-bucketed share counts from cumulative counters.
//!
//! The metrics source exposes shares as an ever-growing counter. To show
//! "shares per day" the samples are grouped by UTC calendar day, the highest
//! reading of each day is kept and consecutive days are differenced.
//!
//! The counter is assumed monotonic. When a day's maximum is lower than the
//! previous day's, the counter was reset (pool restart) and that day reports
//! its own maximum instead of a negative delta.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::DailyShares;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Convert cumulative `(unix_secs, counter)` samples into per-day share counts.
///
/// The first day has no predecessor and reports the growth observed within
/// that day. Days without samples are skipped; the next present day is
/// differenced against the last one seen. Output is sorted by day.
pub fn daily_share_deltas(samples: &[(u64, f64)]) -> Vec<DailyShares> {
    // day -> (min, max)
    let mut per_day: BTreeMap<u64, (f64, f64)> = BTreeMap::new();
    for &(timestamp, value) in samples {
        if !value.is_finite() || value < 0.0 {
            continue;
        }
        per_day
            .entry(timestamp / SECONDS_PER_DAY)
            .and_modify(|(min, max)| {
                *min = min.min(value);
                *max = max.max(value);
            })
            .or_insert((value, value));
    }

    let mut days = Vec::with_capacity(per_day.len());
    let mut previous_max: Option<f64> = None;

    for (day, (min, max)) in per_day {
        let shares = match previous_max {
            None => max - min,
            Some(previous) if max >= previous => max - previous,
            Some(previous) => {
                tracing::debug!(
                    "Share counter reset detected on {}: {} -> {}",
                    civil_date(day),
                    previous,
                    max
                );
                max
            }
        };

        days.push(DailyShares {
            day_start: day * SECONDS_PER_DAY,
            date: civil_date(day),
            shares: shares.round() as u64,
        });
        previous_max = Some(max);
    }

    days
}

/// Format a day count since the Unix epoch as its UTC `YYYY-MM-DD` date.
pub fn civil_date(days_since_epoch: u64) -> String {
    date_of_timestamp(days_since_epoch.saturating_mul(SECONDS_PER_DAY))
}

/// Format a Unix timestamp (seconds) as its UTC date.
///
/// Timestamps beyond what `chrono` can represent yield an empty string.
pub fn date_of_timestamp(timestamp_secs: u64) -> String {
    i64::try_from(timestamp_secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|datetime| datetime.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
