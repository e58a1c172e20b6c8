use std::path::{Path, PathBuf};
use std::time::Duration;

use ext_config::{Config, ConfigError, Environment, File, FileFormat};
use kaspa_upstream::RetryPolicy;
use serde::Deserialize;

use crate::args::Args;

/// Prefix of environment variables that override file values,
/// e.g. `DASHBOARD__UPSTREAM__PROMETHEUS_URL`.
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub queries: QueryTemplates,
    #[serde(skip)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

fn default_listen_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    #[serde(default = "default_price_url")]
    pub price_url: String,
    #[serde(default = "default_coin_id")]
    pub coin_id: String,
    /// Coinbase outputs paying this address count as the block reward.
    /// When unset every coinbase output counts.
    #[serde(default)]
    pub pool_address: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_prometheus_url() -> String {
    "http://127.0.0.1:9090".to_string()
}

fn default_explorer_url() -> String {
    "https://api.kaspa.org".to_string()
}

fn default_price_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_coin_id() -> String {
    "kaspa".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_pool_idle_timeout_secs() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            explorer_url: default_explorer_url(),
            price_url: default_price_url(),
            coin_id: default_coin_id(),
            pool_address: None,
            request_timeout_secs: default_request_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl UpstreamConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries.max(1),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PollingConfig {
    /// How often the background task refreshes the pool overview
    #[serde(default = "default_overview_interval_secs")]
    pub overview_interval_secs: u64,
    /// How often the pages re-fetch JSON
    #[serde(default = "default_client_poll_interval_secs")]
    pub client_poll_interval_secs: u64,
    /// Overview age after which `/health` reports stale
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: u64,
    #[serde(default = "default_block_reward_cache_size")]
    pub block_reward_cache_size: usize,
}

fn default_overview_interval_secs() -> u64 {
    10
}

fn default_client_poll_interval_secs() -> u64 {
    10
}

fn default_stale_threshold_secs() -> u64 {
    60
}

fn default_block_reward_cache_size() -> usize {
    1024
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            overview_interval_secs: default_overview_interval_secs(),
            client_poll_interval_secs: default_client_poll_interval_secs(),
            stale_threshold_secs: default_stale_threshold_secs(),
            block_reward_cache_size: default_block_reward_cache_size(),
        }
    }
}

/// PromQL templates. `{wallet}` is replaced with a validated address.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryTemplates {
    pub pool_hashrate: String,
    pub active_miners: String,
    pub active_workers: String,
    pub blocks: String,
    pub worker_hashrate: String,
    pub worker_hashrate_1h: String,
    pub worker_hashrate_24h: String,
    pub worker_shares: String,
    pub worker_last_seen: String,
    pub wallet_hashrate: String,
    pub wallet_shares: String,
    pub wallet_balance: String,
    /// Every series carrying payout records; results are merged
    pub payouts: Vec<String>,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            pool_hashrate: "sum(pool_hash_rate_GHps)".to_string(),
            active_miners: "count(count by (wallet_address) (miner_hash_rate_GHps > 0))"
                .to_string(),
            active_workers: "count(miner_hash_rate_GHps > 0)".to_string(),
            blocks: "mined_blocks_gauge".to_string(),
            worker_hashrate: r#"miner_hash_rate_GHps{wallet_address="{wallet}"}"#.to_string(),
            worker_hashrate_1h: r#"avg_over_time(miner_hash_rate_GHps{wallet_address="{wallet}"}[1h])"#
                .to_string(),
            worker_hashrate_24h:
                r#"avg_over_time(miner_hash_rate_GHps{wallet_address="{wallet}"}[24h])"#
                    .to_string(),
            worker_shares: r#"miner_added_shares{wallet_address="{wallet}"}"#.to_string(),
            worker_last_seen: r#"miner_last_seen_timestamp{wallet_address="{wallet}"}"#
                .to_string(),
            wallet_hashrate: r#"sum(miner_hash_rate_GHps{wallet_address="{wallet}"})"#
                .to_string(),
            wallet_shares: r#"sum(miner_added_shares{wallet_address="{wallet}"})"#.to_string(),
            wallet_balance: r#"miner_balance_sompi{wallet_address="{wallet}"}"#.to_string(),
            payouts: vec!["miner_payouts_sompi".to_string()],
        }
    }
}

impl DashboardConfig {
    /// Build the configuration from file, environment and CLI, in that
    /// order of increasing precedence.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Self::load(&args.config_path)?;
        config.apply_args(args);
        Ok(config)
    }

    /// Load `path` (optional) with `DASHBOARD__*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = path
            .to_str()
            .ok_or_else(|| ConfigError::Message(format!("Invalid config path: {:?}", path)))?;

        Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(listen_address) = &args.listen_address {
            self.server.listen_address = listen_address.clone();
        }
        if let Some(prometheus_url) = &args.prometheus_url {
            self.upstream.prometheus_url = prometheus_url.clone();
        }
        if args.log_file.is_some() {
            self.log_file = args.log_file.clone();
        }
    }
}
