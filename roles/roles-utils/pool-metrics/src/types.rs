//! View-model types served by the dashboard.
//!
//! Every value here is fetched pre-computed from an upstream service and
//! reshaped for display. Nothing is persisted.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single point in a hashrate time-series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashratePoint {
    /// Unix timestamp (seconds)
    pub timestamp: u64,

    /// Hashrate in GH/s, as reported by the metrics source
    pub hashrate_ghs: f64,
}

impl From<(u64, f64)> for HashratePoint {
    fn from((timestamp, hashrate_ghs): (u64, f64)) -> Self {
        Self {
            timestamp,
            hashrate_ghs,
        }
    }
}

/// A block found by the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: String,
    pub daa_score: u64,
    /// Block timestamp in milliseconds, as Kaspa headers carry it
    pub timestamp_ms: u64,
    /// Coinbase reward credited to the pool. `None` when the explorer lookup failed.
    pub reward_sompi: Option<u64>,
    /// Wallet of the miner that found the block, when the metrics source reports it
    pub miner_wallet: Option<String>,
}

/// One payout entry as reported by a metrics series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub wallet: String,
    pub amount_sompi: u64,
    pub timestamp_secs: u64,
    pub tx_hash: String,
    /// Name of the series the record came from
    pub source: String,
}

/// Payout entries sharing a transaction hash, summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPayout {
    pub tx_hash: String,
    pub wallet: String,
    pub amount_sompi: u64,
    pub timestamp_secs: u64,
    pub entries: usize,
}

/// A single worker (mining device) under a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub wallet: String,
    pub worker: String,
    pub shares: u64,
    pub hashrate_ghs: f64,
    pub hashrate_1h_ghs: Option<f64>,
    pub hashrate_24h_ghs: Option<f64>,
    /// Unix timestamp of the last share seen from this worker
    pub last_seen: Option<u64>,
}

/// Approximate number of shares submitted during one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyShares {
    /// Unix timestamp of 00:00 UTC for the day
    pub day_start: u64,
    /// `YYYY-MM-DD`
    pub date: String,
    pub shares: u64,
}

/// Kaspa network state as reported by the explorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub network_name: String,
    pub block_count: Option<u64>,
    pub difficulty: Option<f64>,
    pub virtual_daa_score: Option<u64>,
    pub network_hashrate_ths: Option<f64>,
    pub block_reward_kas: Option<f64>,
    pub circulating_supply_sompi: Option<u64>,
}

/// Pool-wide figures shown on the landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolOverview {
    pub pool_hashrate_ghs: Option<f64>,
    pub active_miners: Option<u64>,
    pub active_workers: Option<u64>,
    pub blocks_24h: Option<u64>,
    pub network: Option<NetworkInfo>,
    pub price_usd: Option<f64>,
    /// Unix timestamp when the overview was assembled
    pub timestamp: u64,
}

/// Hashrate series plus its outlier-trimmed average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashrateHistory {
    pub from: u64,
    pub to: u64,
    pub step_secs: u64,
    pub points: Vec<HashratePoint>,
    pub smoothed_ghs: Option<f64>,
}

/// Everything the miner page shows for one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerSummary {
    pub wallet: String,
    pub workers: Vec<WorkerRecord>,
    pub total_hashrate_ghs: f64,
    pub balance_sompi: Option<u64>,
    pub total_paid_sompi: Option<u64>,
    pub timestamp: u64,
}

/// Get current Unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
