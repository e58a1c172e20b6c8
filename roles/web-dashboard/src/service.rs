//! Dashboard operations.
//!
//! Each operation fans out to the upstream sources concurrently and reshapes
//! the answers with `pool_metrics`. Secondary values degrade to `None` when
//! their source fails; the primary query of an operation decides whether it
//! succeeds at all.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use kaspa_upstream::{ExplorerSource, InstantSample, MetricsSource, PriceSource, RangeSeries};
use pool_metrics::{
    aggregate_by_transaction,
    bucketing::{DEFAULT_TARGET_POINTS, MAX_RANGE_SECS},
    calculate_step, daily_share_deltas, merge_sources,
    shares::{date_of_timestamp, SECONDS_PER_DAY},
    smoothed_hashrate, total_paid, unix_timestamp, validate_address, AggregatedPayout,
    BlockRecord, DailyShares, HashrateHistory, HashratePoint, KaspaAddress, MinerSummary,
    NetworkInfo, PayoutRecord, PoolOverview, RangeError, WorkerRecord, SOMPI_PER_KAS,
};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    config::QueryTemplates,
    error::{DashboardError, Result},
    BlockRewardCache,
};

pub const MAX_BLOCK_LIMIT: usize = 100;
pub const MAX_PAYOUT_LIMIT: usize = 500;
pub const MAX_SHARE_DAYS: u64 = 90;

/// Resolution of the share counter query behind the daily chart
const SHARES_STEP_SECS: u64 = 3600;

/// Label timestamps below this are seconds, at or above it milliseconds.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

const DEFAULT_WORKER_NAME: &str = "default";

pub const CSV_HEADER: [&str; 6] = [
    "date",
    "timestamp",
    "transaction_hash",
    "amount_kas",
    "amount_sompi",
    "entries",
];

pub struct DashboardService {
    metrics: Arc<dyn MetricsSource>,
    explorer: Arc<dyn ExplorerSource>,
    price: Arc<dyn PriceSource>,
    queries: QueryTemplates,
    pool_address: Option<String>,
    rewards: BlockRewardCache,
}

impl DashboardService {
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        explorer: Arc<dyn ExplorerSource>,
        price: Arc<dyn PriceSource>,
        queries: QueryTemplates,
        pool_address: Option<String>,
        reward_cache_size: usize,
    ) -> Self {
        Self {
            metrics,
            explorer,
            price,
            queries,
            pool_address,
            rewards: BlockRewardCache::new(reward_cache_size),
        }
    }

    pub fn reward_cache(&self) -> &BlockRewardCache {
        &self.rewards
    }

    pub async fn pool_overview(&self) -> Result<PoolOverview> {
        let now = unix_timestamp();
        let (hashrate, miners, workers, blocks, network, price) = tokio::join!(
            self.metrics.query(&self.queries.pool_hashrate),
            self.metrics.query(&self.queries.active_miners),
            self.metrics.query(&self.queries.active_workers),
            self.metrics.query(&self.queries.blocks),
            self.network_info(),
            self.price_usd(),
        );

        let since_ms = now.saturating_sub(SECONDS_PER_DAY).saturating_mul(1000);

        Ok(PoolOverview {
            pool_hashrate_ghs: Some(sum_values(&hashrate?)),
            active_miners: card("active miners", miners).map(|s| count_value(&s)),
            active_workers: card("active workers", workers).map(|s| count_value(&s)),
            blocks_24h: card("blocks", blocks).map(|samples| {
                parse_blocks(&samples)
                    .iter()
                    .filter(|block| block.timestamp_ms >= since_ms)
                    .count() as u64
            }),
            network: card("network info", network),
            price_usd: card("price", price),
            timestamp: now,
        })
    }

    pub async fn network_info(&self) -> Result<NetworkInfo> {
        let (dag, hashrate, reward, supply) = tokio::join!(
            self.explorer.blockdag(),
            self.explorer.network_hashrate_ths(),
            self.explorer.block_reward_kas(),
            self.explorer.coin_supply(),
        );
        let dag = dag?;

        Ok(NetworkInfo {
            network_name: dag.network_name,
            block_count: dag.block_count,
            difficulty: dag.difficulty,
            virtual_daa_score: dag.virtual_daa_score,
            network_hashrate_ths: card("network hashrate", hashrate),
            block_reward_kas: card("block reward", reward),
            circulating_supply_sompi: card("coin supply", supply)
                .and_then(|supply| supply.circulating_supply),
        })
    }

    /// USD price from the price API, or from the explorer when that fails.
    pub async fn price_usd(&self) -> Result<f64> {
        match self.price.usd_price().await {
            Ok(price) => Ok(price),
            Err(e) => {
                debug!("Price API failed, falling back to explorer: {}", e);
                Ok(self.explorer.price_usd().await?)
            }
        }
    }

    pub async fn pool_hashrate_history(&self, range_secs: u64) -> Result<HashrateHistory> {
        self.hashrate_history(&self.queries.pool_hashrate, range_secs)
            .await
    }

    pub async fn recent_blocks(&self, limit: usize) -> Result<Vec<BlockRecord>> {
        check_limit(limit, MAX_BLOCK_LIMIT)?;
        let samples = self.metrics.query(&self.queries.blocks).await?;
        let mut blocks = parse_blocks(&samples);
        blocks.truncate(limit);
        self.fill_rewards(&mut blocks).await;
        Ok(blocks)
    }

    pub async fn recent_payouts(&self, limit: usize) -> Result<Vec<AggregatedPayout>> {
        check_limit(limit, MAX_PAYOUT_LIMIT)?;
        let records = self.payout_records().await?;
        let mut payouts = aggregate_by_transaction(&records);
        payouts.truncate(limit);
        Ok(payouts)
    }

    pub async fn miner_summary(&self, wallet: &str) -> Result<MinerSummary> {
        let address = validate_address(wallet)?;
        let wallet = address.to_string();

        let current_expr = substitute_wallet(&self.queries.worker_hashrate, &address);
        let hour_expr = substitute_wallet(&self.queries.worker_hashrate_1h, &address);
        let day_expr = substitute_wallet(&self.queries.worker_hashrate_24h, &address);
        let shares_expr = substitute_wallet(&self.queries.worker_shares, &address);
        let last_seen_expr = substitute_wallet(&self.queries.worker_last_seen, &address);
        let balance_expr = substitute_wallet(&self.queries.wallet_balance, &address);

        let (current, hour, day, shares, last_seen, balance, payouts) = tokio::join!(
            self.metrics.query(&current_expr),
            self.metrics.query(&hour_expr),
            self.metrics.query(&day_expr),
            self.metrics.query(&shares_expr),
            self.metrics.query(&last_seen_expr),
            self.metrics.query(&balance_expr),
            self.wallet_payouts(&address),
        );

        let mut workers: BTreeMap<String, WorkerRecord> = BTreeMap::new();
        for sample in &current? {
            worker_entry(&mut workers, &wallet, sample).hashrate_ghs = sample.value;
        }
        for sample in card("worker 1h hashrate", hour).unwrap_or_default() {
            worker_entry(&mut workers, &wallet, &sample).hashrate_1h_ghs = Some(sample.value);
        }
        for sample in card("worker 24h hashrate", day).unwrap_or_default() {
            worker_entry(&mut workers, &wallet, &sample).hashrate_24h_ghs = Some(sample.value);
        }
        for sample in card("worker shares", shares).unwrap_or_default() {
            worker_entry(&mut workers, &wallet, &sample).shares = non_negative_u64(sample.value);
        }
        for sample in card("worker last seen", last_seen).unwrap_or_default() {
            worker_entry(&mut workers, &wallet, &sample).last_seen =
                Some(to_secs(non_negative_u64(sample.value)));
        }

        let workers: Vec<WorkerRecord> = workers.into_values().collect();
        let total_hashrate_ghs = workers.iter().map(|w| w.hashrate_ghs).sum();

        Ok(MinerSummary {
            wallet,
            workers,
            total_hashrate_ghs,
            balance_sompi: card("wallet balance", balance)
                .map(|samples| non_negative_u64(sum_values(&samples))),
            total_paid_sompi: card("wallet payouts", payouts).map(|records| total_paid(&records)),
            timestamp: unix_timestamp(),
        })
    }

    pub async fn miner_hashrate_history(
        &self,
        wallet: &str,
        range_secs: u64,
    ) -> Result<HashrateHistory> {
        let address = validate_address(wallet)?;
        let expr = substitute_wallet(&self.queries.wallet_hashrate, &address);
        self.hashrate_history(&expr, range_secs).await
    }

    /// Shares per UTC day for the last `days` days, today included.
    pub async fn miner_daily_shares(&self, wallet: &str, days: u64) -> Result<Vec<DailyShares>> {
        if !(1..=MAX_SHARE_DAYS).contains(&days) {
            return Err(DashboardError::invalid_parameter(
                "days",
                format!("must be between 1 and {}", MAX_SHARE_DAYS),
            ));
        }
        let address = validate_address(wallet)?;
        let expr = substitute_wallet(&self.queries.wallet_shares, &address);

        let now = unix_timestamp();
        let today = now - now % SECONDS_PER_DAY;
        let first_day = today.saturating_sub((days - 1) * SECONDS_PER_DAY);
        // One extra day of samples gives the first reported day a baseline
        let from = first_day.saturating_sub(SECONDS_PER_DAY);

        let series = self
            .metrics
            .query_range(&expr, from, now, SHARES_STEP_SECS)
            .await?;
        let samples = merge_series(series);

        Ok(daily_share_deltas(&samples)
            .into_iter()
            .filter(|day| day.day_start >= first_day)
            .collect())
    }

    pub async fn miner_payouts(&self, wallet: &str) -> Result<Vec<AggregatedPayout>> {
        let address = validate_address(wallet)?;
        let records = self.wallet_payouts(&address).await?;
        Ok(aggregate_by_transaction(&records))
    }

    pub async fn miner_payouts_csv(&self, wallet: &str) -> Result<Vec<u8>> {
        let payouts = self.miner_payouts(wallet).await?;
        payouts_to_csv(&payouts)
    }

    async fn hashrate_history(&self, expr: &str, range_secs: u64) -> Result<HashrateHistory> {
        if range_secs == 0 {
            return Err(RangeError::Empty.into());
        }
        if range_secs > MAX_RANGE_SECS {
            return Err(RangeError::TooLarge(range_secs).into());
        }

        let to = unix_timestamp();
        let from = to.saturating_sub(range_secs);
        let step_secs = calculate_step(from, to, DEFAULT_TARGET_POINTS);

        let series = self.metrics.query_range(expr, from, to, step_secs).await?;
        let points: Vec<HashratePoint> = merge_series(series)
            .into_iter()
            .map(HashratePoint::from)
            .collect();
        let smoothed_ghs = smoothed_hashrate(&points);

        Ok(HashrateHistory {
            from,
            to,
            step_secs,
            points,
            smoothed_ghs,
        })
    }

    /// Coinbase rewards for `blocks`, from cache or fetched concurrently.
    /// A failed lookup leaves the reward unset.
    async fn fill_rewards(&self, blocks: &mut [BlockRecord]) {
        let mut lookups = JoinSet::new();

        for (index, block) in blocks.iter_mut().enumerate() {
            if let Some(reward) = self.rewards.get(&block.hash) {
                block.reward_sompi = Some(reward);
                continue;
            }
            let explorer = Arc::clone(&self.explorer);
            let pool_address = self.pool_address.clone();
            let hash = block.hash.clone();
            lookups.spawn(async move {
                let reward = explorer
                    .block(&hash)
                    .await
                    .map(|block| block.coinbase_reward(pool_address.as_deref()));
                (index, hash, reward)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, hash, Ok(reward))) => {
                    self.rewards.insert(hash, reward);
                    if let Some(block) = blocks.get_mut(index) {
                        block.reward_sompi = Some(reward);
                    }
                }
                Ok((_, hash, Err(e))) => warn!("Reward lookup failed for block {}: {}", hash, e),
                Err(e) => warn!("Reward lookup task failed: {}", e),
            }
        }
    }

    /// Records from every payout series, merged. Fails only when every
    /// series fails.
    async fn payout_records(&self) -> Result<Vec<PayoutRecord>> {
        let mut fetches = JoinSet::new();
        for (index, expr) in self.queries.payouts.iter().enumerate() {
            let metrics = Arc::clone(&self.metrics);
            let expr = expr.clone();
            fetches.spawn(async move {
                let result = metrics.query(&expr).await;
                (index, expr, result)
            });
        }

        // Keep configured order so duplicate resolution is deterministic
        let mut sources: Vec<Option<Vec<PayoutRecord>>> = vec![None; self.queries.payouts.len()];
        let mut last_error = None;

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((index, expr, Ok(samples))) => {
                    let records = samples
                        .iter()
                        .filter_map(|sample| payout_from_sample(sample, &expr))
                        .collect();
                    if let Some(slot) = sources.get_mut(index) {
                        *slot = Some(records);
                    }
                }
                Ok((_, expr, Err(e))) => {
                    warn!("Payout series {} failed: {}", expr, e);
                    last_error = Some(e);
                }
                Err(e) => warn!("Payout query task failed: {}", e),
            }
        }

        let sources: Vec<Vec<PayoutRecord>> = sources.into_iter().flatten().collect();
        if sources.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }
        Ok(merge_sources(sources))
    }

    async fn wallet_payouts(&self, address: &KaspaAddress) -> Result<Vec<PayoutRecord>> {
        let wallet = address.to_string();
        let mut records = self.payout_records().await?;
        records.retain(|record| record.wallet == wallet);
        Ok(records)
    }
}

/// Render aggregated payouts as CSV, one row per transaction.
pub fn payouts_to_csv(payouts: &[AggregatedPayout]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for payout in payouts {
        writer.write_record([
            date_of_timestamp(payout.timestamp_secs),
            payout.timestamp_secs.to_string(),
            payout.tx_hash.clone(),
            format_kas_exact(payout.amount_sompi),
            payout.amount_sompi.to_string(),
            payout.entries.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| DashboardError::Csv(csv::Error::from(e.into_error())))
}

/// Full-precision KAS amount, e.g. `12.50000000`.
fn format_kas_exact(sompi: u64) -> String {
    format!("{}.{:08}", sompi / SOMPI_PER_KAS, sompi % SOMPI_PER_KAS)
}

fn substitute_wallet(template: &str, address: &KaspaAddress) -> String {
    template.replace("{wallet}", &address.to_string())
}

fn check_limit(limit: usize, max: usize) -> Result<()> {
    if limit == 0 || limit > max {
        return Err(DashboardError::invalid_parameter(
            "limit",
            format!("must be between 1 and {}", max),
        ));
    }
    Ok(())
}

/// Log a failed secondary lookup and drop it.
fn card<T, E: Display>(name: &str, result: std::result::Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} unavailable: {}", name, e);
            None
        }
    }
}

/// An empty result (e.g. `sum` over no series) counts as zero.
fn sum_values(samples: &[InstantSample]) -> f64 {
    samples.iter().map(|sample| sample.value).sum()
}

fn count_value(samples: &[InstantSample]) -> u64 {
    non_negative_u64(sum_values(samples))
}

fn non_negative_u64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn to_secs(timestamp: u64) -> u64 {
    if timestamp >= MILLIS_THRESHOLD {
        timestamp / 1000
    } else {
        timestamp
    }
}

fn to_millis(timestamp: u64) -> u64 {
    if timestamp >= MILLIS_THRESHOLD {
        timestamp
    } else {
        timestamp.saturating_mul(1000)
    }
}

fn label_u64(sample: &InstantSample, name: &str) -> Option<u64> {
    let raw = sample.label(name)?.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    })
}

/// Sum series point-wise into one `(timestamp, value)` list.
fn merge_series(series: Vec<RangeSeries>) -> Vec<(u64, f64)> {
    let mut merged: BTreeMap<u64, f64> = BTreeMap::new();
    for s in series {
        for (timestamp, value) in s.samples {
            *merged.entry(timestamp).or_insert(0.0) += value;
        }
    }
    merged.into_iter().collect()
}

fn block_from_sample(sample: &InstantSample) -> Option<BlockRecord> {
    let hash = sample.label("block_hash")?;
    let Some(daa_score) = label_u64(sample, "daa_score") else {
        debug!("Skipping block {} without a DAA score", hash);
        return None;
    };
    // An instant sample's own timestamp is the evaluation time, not the block time
    let Some(timestamp_ms) = label_u64(sample, "timestamp").map(to_millis) else {
        debug!("Skipping block {} without a timestamp", hash);
        return None;
    };

    Some(BlockRecord {
        hash: hash.to_string(),
        daa_score,
        timestamp_ms,
        reward_sompi: None,
        miner_wallet: sample.label("wallet_address").map(str::to_string),
    })
}

/// Unique blocks, highest DAA score first.
fn parse_blocks(samples: &[InstantSample]) -> Vec<BlockRecord> {
    let mut seen = HashSet::new();
    let mut blocks: Vec<BlockRecord> = samples
        .iter()
        .filter_map(block_from_sample)
        .filter(|block| seen.insert(block.hash.clone()))
        .collect();
    blocks.sort_by(|a, b| {
        b.daa_score
            .cmp(&a.daa_score)
            .then_with(|| a.hash.cmp(&b.hash))
    });
    blocks
}

fn payout_from_sample(sample: &InstantSample, source: &str) -> Option<PayoutRecord> {
    let amount_sompi = non_negative_u64(sample.value);
    if amount_sompi == 0 {
        return None;
    }
    Some(PayoutRecord {
        wallet: sample.label("wallet_address")?.to_string(),
        amount_sompi,
        timestamp_secs: label_u64(sample, "timestamp")
            .map(to_secs)
            .unwrap_or(sample.timestamp),
        tx_hash: sample.label("transaction_hash")?.to_string(),
        source: source.to_string(),
    })
}

fn worker_entry<'a>(
    workers: &'a mut BTreeMap<String, WorkerRecord>,
    wallet: &str,
    sample: &InstantSample,
) -> &'a mut WorkerRecord {
    let worker = sample
        .label("miner_id")
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_WORKER_NAME)
        .to_string();
    workers
        .entry(worker.clone())
        .or_insert_with(|| WorkerRecord {
            wallet: wallet.to_string(),
            worker,
            shares: 0,
            hashrate_ghs: 0.0,
            hashrate_1h_ghs: None,
            hashrate_24h_ghs: None,
            last_seen: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        block_with_reward, instant, range, service, FakeExplorer, FakeMetrics, FakePrice,
        POOL_WALLET, WALLET, OTHER_WALLET,
    };
    use kaspa_upstream::UpstreamError;

    fn pool_metrics_fixture() -> FakeMetrics {
        let queries = QueryTemplates::default();
        let now_ms = unix_timestamp() * 1000;
        FakeMetrics::default()
            .with_instant(&queries.pool_hashrate, vec![instant(&[], 2500.0)])
            .with_instant(&queries.active_miners, vec![instant(&[], 3.0)])
            .with_instant(&queries.active_workers, vec![instant(&[], 7.0)])
            .with_instant(
                &queries.blocks,
                vec![
                    instant(
                        &[
                            ("block_hash", "aa"),
                            ("daa_score", "300"),
                            ("timestamp", &(now_ms - 1_000).to_string()),
                            ("wallet_address", WALLET),
                        ],
                        1.0,
                    ),
                    instant(
                        &[
                            ("block_hash", "bb"),
                            ("daa_score", "100"),
                            ("timestamp", &(now_ms - 2 * 86_400_000).to_string()),
                        ],
                        1.0,
                    ),
                    instant(
                        &[
                            ("block_hash", "cc"),
                            ("daa_score", "200"),
                            ("timestamp", &(now_ms / 1000 - 60).to_string()),
                        ],
                        1.0,
                    ),
                    // Same block reported twice
                    instant(
                        &[
                            ("block_hash", "aa"),
                            ("daa_score", "300"),
                            ("timestamp", &(now_ms - 1_000).to_string()),
                        ],
                        1.0,
                    ),
                    // Missing DAA score
                    instant(
                        &[("block_hash", "dd"), ("timestamp", &now_ms.to_string())],
                        1.0,
                    ),
                    // Missing timestamp: must not count as found just now
                    instant(&[("block_hash", "ee"), ("daa_score", "400")], 1.0),
                ],
            )
    }

    #[tokio::test]
    async fn test_pool_overview() {
        let service = service(
            pool_metrics_fixture(),
            FakeExplorer::healthy(),
            FakePrice::with_price(0.12),
        );
        let overview = service.pool_overview().await.unwrap();

        assert_eq!(overview.pool_hashrate_ghs, Some(2500.0));
        assert_eq!(overview.active_miners, Some(3));
        assert_eq!(overview.active_workers, Some(7));
        // aa (ms timestamp) and cc (seconds timestamp) are recent, bb is two days old
        assert_eq!(overview.blocks_24h, Some(2));
        assert_eq!(overview.price_usd, Some(0.12));
        let network = overview.network.unwrap();
        assert_eq!(network.network_name, "kaspa-mainnet");
        assert_eq!(network.network_hashrate_ths, Some(450_000.0));
        assert!(overview.timestamp > 0);
    }

    #[tokio::test]
    async fn test_pool_overview_degrades_secondary_cards() {
        let queries = QueryTemplates::default();
        let metrics =
            FakeMetrics::default().with_instant(&queries.pool_hashrate, vec![instant(&[], 10.0)]);
        let service = service(metrics, FakeExplorer::failing(), FakePrice::failing());

        let overview = service.pool_overview().await.unwrap();
        assert_eq!(overview.pool_hashrate_ghs, Some(10.0));
        assert_eq!(overview.active_miners, None);
        assert_eq!(overview.blocks_24h, None);
        assert_eq!(overview.network, None);
        assert_eq!(overview.price_usd, None);
    }

    #[tokio::test]
    async fn test_pool_overview_fails_without_pool_hashrate() {
        let service = service(
            FakeMetrics::default(),
            FakeExplorer::healthy(),
            FakePrice::with_price(0.1),
        );
        let err = service.pool_overview().await.unwrap_err();
        assert!(matches!(err, DashboardError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_empty_pool_hashrate_is_zero() {
        let queries = QueryTemplates::default();
        let metrics = FakeMetrics::default().with_instant(&queries.pool_hashrate, vec![]);
        let service = service(metrics, FakeExplorer::healthy(), FakePrice::with_price(0.1));
        let overview = service.pool_overview().await.unwrap();
        assert_eq!(overview.pool_hashrate_ghs, Some(0.0));
    }

    #[tokio::test]
    async fn test_price_falls_back_to_explorer() {
        let service = service(
            FakeMetrics::default(),
            FakeExplorer::healthy(),
            FakePrice::failing(),
        );
        assert_eq!(service.price_usd().await.unwrap(), 0.09);

        let service = service_with_no_price_anywhere();
        assert!(matches!(
            service.price_usd().await,
            Err(DashboardError::Upstream(_))
        ));
    }

    fn service_with_no_price_anywhere() -> DashboardService {
        service(
            FakeMetrics::default(),
            FakeExplorer::failing(),
            FakePrice::failing(),
        )
    }

    #[tokio::test]
    async fn test_network_info_requires_blockdag() {
        let unavailable = service_with_no_price_anywhere();
        assert!(matches!(
            unavailable.network_info().await,
            Err(DashboardError::Upstream(_))
        ));

        let mut explorer = FakeExplorer::healthy();
        explorer.hashrate = None;
        explorer.supply = None;
        let service = service(FakeMetrics::default(), explorer, FakePrice::failing());
        let info = service.network_info().await.unwrap();
        assert_eq!(info.block_count, Some(1234));
        assert_eq!(info.network_hashrate_ths, None);
        assert_eq!(info.block_reward_kas, Some(55.0));
        assert_eq!(info.circulating_supply_sompi, None);
    }

    #[tokio::test]
    async fn test_recent_blocks_sorted_and_rewarded() {
        let mut explorer = FakeExplorer::healthy();
        explorer.blocks.insert("aa".to_string(), block_with_reward(5_500_000_000));
        explorer.blocks.insert("cc".to_string(), block_with_reward(4_000_000_000));
        // "bb" has no explorer entry, its reward lookup fails
        let explorer = Arc::new(explorer);
        let service = crate::test_support::service_with_explorer(
            pool_metrics_fixture(),
            explorer.clone(),
            FakePrice::with_price(0.1),
        );

        let blocks = service.recent_blocks(10).await.unwrap();
        let hashes: Vec<&str> = blocks.iter().map(|b| b.hash.as_str()).collect();
        assert_eq!(hashes, vec!["aa", "cc", "bb"]);
        assert_eq!(blocks[0].reward_sompi, Some(5_500_000_000));
        assert_eq!(blocks[0].miner_wallet.as_deref(), Some(WALLET));
        assert_eq!(blocks[1].reward_sompi, Some(4_000_000_000));
        assert_eq!(blocks[2].reward_sompi, None);
        assert_eq!(explorer.block_calls(), 3);

        // Known rewards come from the cache on the next call
        let blocks = service.recent_blocks(2).await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].reward_sompi, Some(4_000_000_000));
        assert_eq!(explorer.block_calls(), 3);
        assert_eq!(service.reward_cache().len(), 2);
    }

    #[test]
    fn test_block_without_timestamp_label_is_skipped() {
        let mut sample = instant(&[("block_hash", "ff"), ("daa_score", "9")], 1.0);
        sample.timestamp = unix_timestamp();
        assert_eq!(block_from_sample(&sample), None);

        let sample = instant(
            &[("block_hash", "ff"), ("daa_score", "9"), ("timestamp", "1700000000")],
            1.0,
        );
        let block = block_from_sample(&sample).unwrap();
        assert_eq!(block.timestamp_ms, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_recent_blocks_limit_bounds() {
        let service = service(
            pool_metrics_fixture(),
            FakeExplorer::healthy(),
            FakePrice::with_price(0.1),
        );
        for limit in [0, MAX_BLOCK_LIMIT + 1] {
            assert!(matches!(
                service.recent_blocks(limit).await,
                Err(DashboardError::InvalidParameter { name: "limit", .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_pool_hashrate_history() {
        let queries = QueryTemplates::default();
        let metrics = FakeMetrics::default().with_range(
            &queries.pool_hashrate,
            vec![range(&[], &[(100, 10.0), (160, 12.0), (220, 500.0)])],
        );
        let (metrics, calls) = metrics.tracked();
        let service = service(metrics, FakeExplorer::healthy(), FakePrice::failing());

        let history = service.pool_hashrate_history(86_400).await.unwrap();
        assert_eq!(history.step_secs, 1800);
        assert_eq!(history.to - history.from, 86_400);
        assert_eq!(history.points.len(), 3);
        assert_eq!(history.points[1].hashrate_ghs, 12.0);
        // Three samples are too few to trim, plain mean
        assert_eq!(history.smoothed_ghs, Some(174.0));

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].3, 1800);
    }

    #[tokio::test]
    async fn test_history_range_validation() {
        let service = service(
            FakeMetrics::default(),
            FakeExplorer::healthy(),
            FakePrice::failing(),
        );
        assert!(matches!(
            service.pool_hashrate_history(0).await,
            Err(DashboardError::InvalidRange(RangeError::Empty))
        ));
        assert!(matches!(
            service.pool_hashrate_history(MAX_RANGE_SECS + 1).await,
            Err(DashboardError::InvalidRange(RangeError::TooLarge(_)))
        ));
    }

    #[tokio::test]
    async fn test_miner_hashrate_history_merges_series() {
        let queries = QueryTemplates::default();
        let expr = queries.wallet_hashrate.replace("{wallet}", WALLET);
        let metrics = FakeMetrics::default().with_range(
            &expr,
            vec![
                range(&[("miner_id", "rig1")], &[(100, 1.0), (160, 2.0)]),
                range(&[("miner_id", "rig2")], &[(100, 3.0)]),
            ],
        );
        let service = service(metrics, FakeExplorer::healthy(), FakePrice::failing());

        let history = service.miner_hashrate_history(WALLET, 3600).await.unwrap();
        assert_eq!(
            history.points,
            vec![
                HashratePoint::from((100, 4.0)),
                HashratePoint::from((160, 2.0))
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_wallet_is_rejected_before_querying() {
        let (metrics, calls) = FakeMetrics::default().tracked();
        let service = service(metrics, FakeExplorer::healthy(), FakePrice::failing());

        for result in [
            service.miner_summary("kaspa:nope").await.map(|_| ()),
            service.miner_payouts("not-an-address").await.map(|_| ()),
            service.miner_daily_shares("kaspa:", 7).await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(DashboardError::InvalidAddress(_))));
        }
        assert!(calls.lock().unwrap().is_empty());
    }

    fn miner_metrics() -> FakeMetrics {
        let queries = QueryTemplates::default();
        let q = |template: &str| template.replace("{wallet}", WALLET);
        FakeMetrics::default()
            .with_instant(
                &q(&queries.worker_hashrate),
                vec![
                    instant(&[("miner_id", "rig1")], 100.0),
                    instant(&[("miner_id", "rig2")], 50.5),
                ],
            )
            .with_instant(
                &q(&queries.worker_hashrate_1h),
                vec![instant(&[("miner_id", "rig1")], 95.0)],
            )
            .with_instant(
                &q(&queries.worker_shares),
                vec![
                    instant(&[("miner_id", "rig1")], 1200.0),
                    instant(&[("miner_id", "rig2")], 600.0),
                    // Offline worker only present in the counter series
                    instant(&[("miner_id", "rig3")], 10.0),
                ],
            )
            .with_instant(
                &q(&queries.worker_last_seen),
                vec![instant(&[("miner_id", "rig1")], 1_700_000_000_000.0)],
            )
            .with_instant(
                &q(&queries.wallet_balance),
                vec![instant(&[], 123_456_789.0)],
            )
            .with_instant(
                "miner_payouts_sompi",
                vec![
                    payout_sample(WALLET, "tx1", 100_000_000.0, "1700000000"),
                    payout_sample(WALLET, "tx1", 50_000_000.0, "1700000000"),
                    payout_sample(WALLET, "tx2", 25_000_000.0, "1700086400000"),
                    payout_sample(OTHER_WALLET, "tx1", 70_000_000.0, "1700000000"),
                    // Zero amounts are not payouts
                    payout_sample(WALLET, "tx3", 0.0, "1700000000"),
                ],
            )
    }

    fn payout_sample(wallet: &str, tx: &str, amount: f64, timestamp: &str) -> InstantSample {
        instant(
            &[
                ("wallet_address", wallet),
                ("transaction_hash", tx),
                ("timestamp", timestamp),
            ],
            amount,
        )
    }

    #[tokio::test]
    async fn test_miner_summary() {
        let service = service(miner_metrics(), FakeExplorer::healthy(), FakePrice::failing());
        let summary = service.miner_summary(WALLET).await.unwrap();

        assert_eq!(summary.wallet, WALLET);
        assert_eq!(summary.workers.len(), 3);
        assert_eq!(summary.total_hashrate_ghs, 150.5);
        assert_eq!(summary.balance_sompi, Some(123_456_789));
        assert_eq!(summary.total_paid_sompi, Some(175_000_000));

        let rig1 = &summary.workers[0];
        assert_eq!(rig1.worker, "rig1");
        assert_eq!(rig1.shares, 1200);
        assert_eq!(rig1.hashrate_1h_ghs, Some(95.0));
        assert_eq!(rig1.hashrate_24h_ghs, None);
        assert_eq!(rig1.last_seen, Some(1_700_000_000));

        let rig3 = &summary.workers[2];
        assert_eq!(rig3.worker, "rig3");
        assert_eq!(rig3.hashrate_ghs, 0.0);
        assert_eq!(rig3.shares, 10);
    }

    #[tokio::test]
    async fn test_miner_summary_accepts_uppercase_wallet() {
        let service = service(miner_metrics(), FakeExplorer::healthy(), FakePrice::failing());
        let summary = service
            .miner_summary(&WALLET.to_uppercase())
            .await
            .unwrap();
        assert_eq!(summary.wallet, WALLET);
        assert_eq!(summary.workers.len(), 3);
    }

    #[tokio::test]
    async fn test_miner_payouts_aggregated_per_transaction() {
        let service = service(miner_metrics(), FakeExplorer::healthy(), FakePrice::failing());
        let payouts = service.miner_payouts(WALLET).await.unwrap();

        assert_eq!(payouts.len(), 2);
        // Newest first; the millisecond label was normalised to seconds
        assert_eq!(payouts[0].tx_hash, "tx2");
        assert_eq!(payouts[0].timestamp_secs, 1_700_086_400);
        assert_eq!(payouts[1].tx_hash, "tx1");
        assert_eq!(payouts[1].amount_sompi, 150_000_000);
        assert_eq!(payouts[1].entries, 2);
    }

    #[tokio::test]
    async fn test_payout_sources_are_merged() {
        let mut queries = QueryTemplates::default();
        queries.payouts = vec!["series_a".to_string(), "series_b".to_string()];
        let metrics = FakeMetrics::default()
            .with_instant(
                "series_a",
                vec![payout_sample(WALLET, "tx1", 100.0, "1700000000")],
            )
            .with_instant(
                "series_b",
                vec![
                    payout_sample(WALLET, "tx1", 100.0, "1700000000"),
                    payout_sample(WALLET, "tx2", 300.0, "1700000100"),
                ],
            );
        let service = crate::test_support::service_with_queries(metrics, queries);

        let payouts = service.recent_payouts(50).await.unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[1].tx_hash, "tx1");
        assert_eq!(payouts[1].amount_sompi, 100);
        assert_eq!(payouts[1].entries, 1);
    }

    #[tokio::test]
    async fn test_one_failing_payout_source_is_tolerated() {
        let mut queries = QueryTemplates::default();
        queries.payouts = vec!["series_a".to_string(), "missing".to_string()];
        let metrics = FakeMetrics::default().with_instant(
            "series_a",
            vec![payout_sample(POOL_WALLET, "tx9", 42.0, "1700000000")],
        );
        let service = crate::test_support::service_with_queries(metrics, queries.clone());
        assert_eq!(service.recent_payouts(10).await.unwrap().len(), 1);

        queries.payouts = vec!["missing".to_string()];
        let service = crate::test_support::service_with_queries(FakeMetrics::default(), queries);
        assert!(matches!(
            service.recent_payouts(10).await,
            Err(DashboardError::Upstream(UpstreamError::Query { .. }))
        ));
    }

    #[tokio::test]
    async fn test_miner_daily_shares() {
        let queries = QueryTemplates::default();
        let expr = queries.wallet_shares.replace("{wallet}", WALLET);
        let now = unix_timestamp();
        let today = now - now % SECONDS_PER_DAY;
        let day = SECONDS_PER_DAY;

        // Counter samples from three days ago (outside a 2-day window) to today
        let samples = [
            (today - 3 * day, 50.0),
            (today - 2 * day + 3600, 100.0),
            (today - 2 * day + 7200, 150.0),
            (today - day + 3600, 400.0),
            (today + 60, 20.0),
        ];
        let metrics = FakeMetrics::default().with_range(&expr, vec![range(&[], &samples)]);
        let (metrics, calls) = metrics.tracked();
        let service = service(metrics, FakeExplorer::healthy(), FakePrice::failing());

        let days = service.miner_daily_shares(WALLET, 2).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day_start, today - day);
        assert_eq!(days[0].shares, 250);
        // Counter reset today
        assert_eq!(days[1].day_start, today);
        assert_eq!(days[1].shares, 20);
        assert_eq!(days[1].date, date_of_timestamp(now));

        let recorded = calls.lock().unwrap();
        let (_, from, _, step) = &recorded[0];
        assert_eq!(*from, today - 2 * day);
        assert_eq!(*step, SHARES_STEP_SECS);
    }

    #[tokio::test]
    async fn test_miner_daily_shares_bounds() {
        let service = service(miner_metrics(), FakeExplorer::healthy(), FakePrice::failing());
        for days in [0, MAX_SHARE_DAYS + 1] {
            assert!(matches!(
                service.miner_daily_shares(WALLET, days).await,
                Err(DashboardError::InvalidParameter { name: "days", .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_miner_payouts_csv() {
        let service = service(miner_metrics(), FakeExplorer::healthy(), FakePrice::failing());
        let csv = String::from_utf8(service.miner_payouts_csv(WALLET).await.unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "date,timestamp,transaction_hash,amount_kas,amount_sompi,entries"
        );
        assert_eq!(lines[1], "2023-11-15,1700086400,tx2,0.25000000,25000000,1");
        assert_eq!(lines[2], "2023-11-14,1700000000,tx1,1.50000000,150000000,2");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_with_no_payouts_has_header_only() {
        let csv = String::from_utf8(payouts_to_csv(&[]).unwrap()).unwrap();
        assert_eq!(
            csv,
            "date,timestamp,transaction_hash,amount_kas,amount_sompi,entries\n"
        );
    }

    #[test]
    fn test_timestamp_normalisation() {
        assert_eq!(to_secs(1_700_000_000), 1_700_000_000);
        assert_eq!(to_secs(1_700_000_000_123), 1_700_000_000);
        assert_eq!(to_millis(1_700_000_000), 1_700_000_000_000);
        assert_eq!(to_millis(1_700_000_000_123), 1_700_000_000_123);
    }
}
