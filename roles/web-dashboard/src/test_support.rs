//! Canned upstream sources for service and route tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kaspa_upstream::{
    error::Result, BlockDagInfo, CoinSupply, ExplorerBlock, ExplorerSource, InstantSample,
    MetricsSource, PriceSource, RangeSeries, UpstreamError,
};

use crate::{config::QueryTemplates, DashboardService};

pub const WALLET: &str = "kaspa:qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqkx9awp4e";
pub const OTHER_WALLET: &str =
    "kaspa:qyqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqudzvdn9c";
pub const POOL_WALLET: &str = "kaspa:pool-payout-wallet";

pub type CallLog = Arc<Mutex<Vec<(String, u64, u64, u64)>>>;

fn not_found(what: &str) -> UpstreamError {
    UpstreamError::Query {
        error_type: "bad_data".to_string(),
        message: format!("no fixture for {}", what),
    }
}

fn unavailable(what: &str) -> UpstreamError {
    UpstreamError::Status {
        status: 503,
        url: what.to_string(),
    }
}

pub fn instant(labels: &[(&str, &str)], value: f64) -> InstantSample {
    InstantSample {
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        timestamp: 1_700_000_000,
        value,
    }
}

pub fn range(labels: &[(&str, &str)], samples: &[(u64, f64)]) -> RangeSeries {
    RangeSeries {
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        samples: samples.to_vec(),
    }
}

/// Metrics answering only the expressions it was given.
#[derive(Default)]
pub struct FakeMetrics {
    instant: HashMap<String, Vec<InstantSample>>,
    ranges: HashMap<String, Vec<RangeSeries>>,
    calls: CallLog,
}

impl FakeMetrics {
    pub fn with_instant(mut self, expr: &str, samples: Vec<InstantSample>) -> Self {
        self.instant.insert(expr.to_string(), samples);
        self
    }

    pub fn with_range(mut self, expr: &str, series: Vec<RangeSeries>) -> Self {
        self.ranges.insert(expr.to_string(), series);
        self
    }

    /// Every call is logged as `(expr, start, end, step)`; instant queries log zeros.
    pub fn tracked(self) -> (Self, CallLog) {
        let calls = self.calls.clone();
        (self, calls)
    }

    fn log(&self, expr: &str, start: u64, end: u64, step: u64) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((expr.to_string(), start, end, step));
        }
    }
}

#[async_trait::async_trait]
impl MetricsSource for FakeMetrics {
    async fn query(&self, expr: &str) -> Result<Vec<InstantSample>> {
        self.log(expr, 0, 0, 0);
        self.instant.get(expr).cloned().ok_or_else(|| not_found(expr))
    }

    async fn query_range(
        &self,
        expr: &str,
        start: u64,
        end: u64,
        step: u64,
    ) -> Result<Vec<RangeSeries>> {
        self.log(expr, start, end, step);
        self.ranges.get(expr).cloned().ok_or_else(|| not_found(expr))
    }
}

pub struct FakeExplorer {
    pub price: Option<f64>,
    pub dag: Option<BlockDagInfo>,
    pub hashrate: Option<f64>,
    pub reward: Option<f64>,
    pub supply: Option<CoinSupply>,
    pub blocks: HashMap<String, ExplorerBlock>,
    block_calls: AtomicUsize,
}

impl FakeExplorer {
    pub fn healthy() -> Self {
        Self {
            price: Some(0.09),
            dag: Some(BlockDagInfo {
                network_name: "kaspa-mainnet".to_string(),
                block_count: Some(1234),
                header_count: Some(1234),
                difficulty: Some(1.5e15),
                virtual_daa_score: Some(71_234_567),
            }),
            hashrate: Some(450_000.0),
            reward: Some(55.0),
            supply: Some(CoinSupply {
                circulating_supply: Some(2_500_000_000_000_000_000),
                max_supply: Some(2_870_000_000_000_000_000),
            }),
            blocks: HashMap::new(),
            block_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            price: None,
            dag: None,
            hashrate: None,
            reward: None,
            supply: None,
            blocks: HashMap::new(),
            block_calls: AtomicUsize::new(0),
        }
    }

    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ExplorerSource for FakeExplorer {
    async fn price_usd(&self) -> Result<f64> {
        self.price.ok_or_else(|| unavailable("/info/price"))
    }

    async fn network_hashrate_ths(&self) -> Result<f64> {
        self.hashrate.ok_or_else(|| unavailable("/info/hashrate"))
    }

    async fn blockdag(&self) -> Result<BlockDagInfo> {
        self.dag.clone().ok_or_else(|| unavailable("/info/blockdag"))
    }

    async fn block_reward_kas(&self) -> Result<f64> {
        self.reward.ok_or_else(|| unavailable("/info/blockreward"))
    }

    async fn coin_supply(&self) -> Result<CoinSupply> {
        self.supply.clone().ok_or_else(|| unavailable("/info/coinsupply"))
    }

    async fn block(&self, hash: &str) -> Result<ExplorerBlock> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        self.blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                url: format!("/blocks/{}", hash),
            })
    }
}

/// An explorer block whose coinbase pays `reward_sompi` to a single output.
pub fn block_with_reward(reward_sompi: u64) -> ExplorerBlock {
    serde_json::from_value(serde_json::json!({
        "header": {"timestamp": "1700000000000", "daaScore": "1"},
        "transactions": [{
            "subnetworkId": "0100000000000000000000000000000000000000",
            "outputs": [{"amount": reward_sompi.to_string()}]
        }]
    }))
    .unwrap()
}

pub struct FakePrice {
    usd: Option<f64>,
}

impl FakePrice {
    pub fn with_price(usd: f64) -> Self {
        Self { usd: Some(usd) }
    }

    pub fn failing() -> Self {
        Self { usd: None }
    }
}

#[async_trait::async_trait]
impl PriceSource for FakePrice {
    async fn usd_price(&self) -> Result<f64> {
        self.usd.ok_or_else(|| unavailable("/simple/price"))
    }
}

pub fn service(metrics: FakeMetrics, explorer: FakeExplorer, price: FakePrice) -> DashboardService {
    service_with_explorer(metrics, Arc::new(explorer), price)
}

pub fn service_with_explorer(
    metrics: FakeMetrics,
    explorer: Arc<FakeExplorer>,
    price: FakePrice,
) -> DashboardService {
    DashboardService::new(
        Arc::new(metrics),
        explorer,
        Arc::new(price),
        QueryTemplates::default(),
        None,
        16,
    )
}

pub fn service_with_queries(metrics: FakeMetrics, queries: QueryTemplates) -> DashboardService {
    DashboardService::new(
        Arc::new(metrics),
        Arc::new(FakeExplorer::healthy()),
        Arc::new(FakePrice::failing()),
        queries,
        None,
        16,
    )
}
