//! Presentation-layer data shaping for the Kaspa pool dashboard.
//!
//! Every number the dashboard shows is computed upstream. This crate holds
//! the view-model types and the small transformations applied before
//! display: outlier-trimmed hashrate averages, per-day share counts from
//! cumulative counters, payout grouping, range-query step selection and
//! wallet address validation.

pub mod address;
pub mod bucketing;
pub mod payouts;
pub mod shares;
pub mod smoothing;
pub mod types;
pub mod units;

pub use address::{validate_address, AddressError, KaspaAddress};
pub use bucketing::{calculate_step, parse_range, RangeError};
pub use payouts::{aggregate_by_transaction, merge_sources, total_paid};
pub use shares::daily_share_deltas;
pub use smoothing::{smoothed_hashrate, trimmed_mean};
pub use types::{
    unix_timestamp, AggregatedPayout, BlockRecord, DailyShares, HashrateHistory, HashratePoint,
    MinerSummary, NetworkInfo, PayoutRecord, PoolOverview, WorkerRecord,
};
pub use units::{kas_to_sompi, sompi_to_kas, SOMPI_PER_KAS};
