//! Payout aggregation.
//!
//! A single payout transaction can pay a wallet through several outputs, and
//! the metrics source reports one series entry per output. The dashboard
//! shows one row per transaction with the amounts summed.

use std::collections::{HashMap, HashSet};

use crate::types::{AggregatedPayout, PayoutRecord};

/// Concatenate payout records from several series, dropping entries that
/// more than one series reports identically.
///
/// Two records are duplicates when transaction hash, wallet, amount and
/// timestamp all match; the first occurrence (and its `source`) wins.
pub fn merge_sources(sources: Vec<Vec<PayoutRecord>>) -> Vec<PayoutRecord> {
    let mut seen: HashSet<(String, String, u64, u64)> = HashSet::new();
    let mut merged = Vec::new();

    for record in sources.into_iter().flatten() {
        let key = (
            record.tx_hash.clone(),
            record.wallet.clone(),
            record.amount_sompi,
            record.timestamp_secs,
        );
        if seen.insert(key) {
            merged.push(record);
        }
    }

    merged
}

/// Group payout records by transaction hash and sum their amounts.
///
/// The aggregated entry keeps the latest timestamp of its group and the
/// wallet of the first record seen. Output is newest first, ties broken by
/// transaction hash so the order is stable.
pub fn aggregate_by_transaction(records: &[PayoutRecord]) -> Vec<AggregatedPayout> {
    let mut groups: HashMap<&str, AggregatedPayout> = HashMap::new();

    for record in records {
        groups
            .entry(record.tx_hash.as_str())
            .and_modify(|group| {
                group.amount_sompi = group.amount_sompi.saturating_add(record.amount_sompi);
                group.timestamp_secs = group.timestamp_secs.max(record.timestamp_secs);
                group.entries += 1;
            })
            .or_insert_with(|| AggregatedPayout {
                tx_hash: record.tx_hash.clone(),
                wallet: record.wallet.clone(),
                amount_sompi: record.amount_sompi,
                timestamp_secs: record.timestamp_secs,
                entries: 1,
            });
    }

    let mut aggregated: Vec<AggregatedPayout> = groups.into_values().collect();
    aggregated.sort_by(|a, b| {
        b.timestamp_secs
            .cmp(&a.timestamp_secs)
            .then_with(|| a.tx_hash.cmp(&b.tx_hash))
    });
    aggregated
}

/// Total sompi paid across all records.
pub fn total_paid(records: &[PayoutRecord]) -> u64 {
    records
        .iter()
        .fold(0u64, |total, r| total.saturating_add(r.amount_sompi))
}
