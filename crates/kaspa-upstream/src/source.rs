//! Trait seams over the upstream clients.
//!
//! The dashboard service only talks to these traits so tests can swap in
//! canned data.

use crate::{
    error::Result,
    explorer::{BlockDagInfo, CoinSupply, ExplorerBlock, ExplorerClient},
    price::PriceClient,
    prometheus::{InstantSample, PrometheusClient, RangeSeries},
};

#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query(&self, expr: &str) -> Result<Vec<InstantSample>>;

    async fn query_range(
        &self,
        expr: &str,
        start: u64,
        end: u64,
        step: u64,
    ) -> Result<Vec<RangeSeries>>;
}

#[async_trait::async_trait]
pub trait ExplorerSource: Send + Sync {
    async fn price_usd(&self) -> Result<f64>;

    async fn network_hashrate_ths(&self) -> Result<f64>;

    async fn blockdag(&self) -> Result<BlockDagInfo>;

    async fn block_reward_kas(&self) -> Result<f64>;

    async fn coin_supply(&self) -> Result<CoinSupply>;

    async fn block(&self, hash: &str) -> Result<ExplorerBlock>;
}

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self) -> Result<f64>;
}

#[async_trait::async_trait]
impl MetricsSource for PrometheusClient {
    async fn query(&self, expr: &str) -> Result<Vec<InstantSample>> {
        PrometheusClient::query(self, expr).await
    }

    async fn query_range(
        &self,
        expr: &str,
        start: u64,
        end: u64,
        step: u64,
    ) -> Result<Vec<RangeSeries>> {
        PrometheusClient::query_range(self, expr, start, end, step).await
    }
}

#[async_trait::async_trait]
impl ExplorerSource for ExplorerClient {
    async fn price_usd(&self) -> Result<f64> {
        ExplorerClient::price_usd(self).await
    }

    async fn network_hashrate_ths(&self) -> Result<f64> {
        ExplorerClient::network_hashrate_ths(self).await
    }

    async fn blockdag(&self) -> Result<BlockDagInfo> {
        ExplorerClient::blockdag(self).await
    }

    async fn block_reward_kas(&self) -> Result<f64> {
        ExplorerClient::block_reward_kas(self).await
    }

    async fn coin_supply(&self) -> Result<CoinSupply> {
        ExplorerClient::coin_supply(self).await
    }

    async fn block(&self, hash: &str) -> Result<ExplorerBlock> {
        ExplorerClient::block(self, hash).await
    }
}

#[async_trait::async_trait]
impl PriceSource for PriceClient {
    async fn usd_price(&self) -> Result<f64> {
        PriceClient::usd_price(self).await
    }
}
