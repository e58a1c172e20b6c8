//! Client for the public Kaspa REST explorer API.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    de,
    error::Result,
    http::{get_json, RetryPolicy},
};

/// Subnetwork id carried by coinbase transactions.
const COINBASE_SUBNETWORK_ID: &str = "0100000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDagInfo {
    pub network_name: String,
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub block_count: Option<u64>,
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub header_count: Option<u64>,
    #[serde(default, deserialize_with = "de::option_f64_lenient")]
    pub difficulty: Option<f64>,
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub virtual_daa_score: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSupply {
    /// Circulating supply in sompi
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub circulating_supply: Option<u64>,
    /// Maximum supply in sompi
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub max_supply: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(deserialize_with = "de::f64_lenient")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct HashrateResponse {
    /// Network hashrate in TH/s
    #[serde(deserialize_with = "de::f64_lenient")]
    hashrate: f64,
}

#[derive(Debug, Deserialize)]
struct BlockRewardResponse {
    #[serde(deserialize_with = "de::f64_lenient")]
    blockreward: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerBlock {
    pub header: BlockHeader,
    #[serde(default)]
    pub transactions: Vec<ExplorerTransaction>,
    #[serde(default)]
    pub verbose_data: Option<BlockVerboseData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(default)]
    pub hash: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(deserialize_with = "de::u64_lenient")]
    pub timestamp: u64,
    #[serde(deserialize_with = "de::u64_lenient")]
    pub daa_score: u64,
    #[serde(default, deserialize_with = "de::option_u64_lenient")]
    pub blue_score: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockVerboseData {
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerTransaction {
    #[serde(default)]
    pub subnetwork_id: Option<String>,
    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    #[serde(deserialize_with = "de::u64_lenient")]
    pub amount: u64,
    #[serde(default)]
    pub verbose_data: Option<OutputVerboseData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputVerboseData {
    #[serde(default)]
    pub script_public_key_address: Option<String>,
}

impl ExplorerBlock {
    pub fn hash(&self) -> Option<&str> {
        self.header
            .hash
            .as_deref()
            .or_else(|| self.verbose_data.as_ref().and_then(|v| v.hash.as_deref()))
    }

    fn coinbase(&self) -> Option<&ExplorerTransaction> {
        self.transactions
            .iter()
            .find(|tx| tx.subnetwork_id.as_deref() == Some(COINBASE_SUBNETWORK_ID))
            .or_else(|| self.transactions.first())
    }

    /// Sum of the coinbase outputs, in sompi.
    ///
    /// With `pool_address` set only outputs paying that address count; the
    /// coinbase of a block also pays the miners of merged blue blocks.
    pub fn coinbase_reward(&self, pool_address: Option<&str>) -> u64 {
        let Some(coinbase) = self.coinbase() else {
            return 0;
        };
        coinbase
            .outputs
            .iter()
            .filter(|output| match pool_address {
                Some(address) => {
                    output
                        .verbose_data
                        .as_ref()
                        .and_then(|v| v.script_public_key_address.as_deref())
                        == Some(address)
                }
                None => true,
            })
            .fold(0u64, |total, output| total.saturating_add(output.amount))
    }
}

pub struct ExplorerClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ExplorerClient {
    pub fn new(base_url: &str, http: Client, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        get_json(&self.http, &url, query, self.retry).await
    }

    pub async fn price_usd(&self) -> Result<f64> {
        let response: PriceResponse = self.get("/info/price", &[]).await?;
        Ok(response.price)
    }

    pub async fn network_hashrate_ths(&self) -> Result<f64> {
        let response: HashrateResponse = self
            .get("/info/hashrate", &[("stringOnly", "false".to_string())])
            .await?;
        Ok(response.hashrate)
    }

    pub async fn blockdag(&self) -> Result<BlockDagInfo> {
        self.get("/info/blockdag", &[]).await
    }

    pub async fn block_reward_kas(&self) -> Result<f64> {
        let response: BlockRewardResponse = self
            .get("/info/blockreward", &[("stringOnly", "false".to_string())])
            .await?;
        Ok(response.blockreward)
    }

    pub async fn coin_supply(&self) -> Result<CoinSupply> {
        self.get("/info/coinsupply", &[]).await
    }

    pub async fn block(&self, hash: &str) -> Result<ExplorerBlock> {
        self.get(
            &format!("/blocks/{}", hash),
            &[("includeColor", "false".to_string())],
        )
        .await
    }
}
