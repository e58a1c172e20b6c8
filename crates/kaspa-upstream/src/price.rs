//! Client for a CoinGecko-style `simple/price` endpoint.

use std::collections::HashMap;

use reqwest::Client;

use crate::{
    error::{Result, UpstreamError},
    http::{get_json, RetryPolicy},
};

pub struct PriceClient {
    http: Client,
    base_url: String,
    coin_id: String,
    retry: RetryPolicy,
}

impl PriceClient {
    pub fn new(base_url: &str, coin_id: &str, http: Client, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            coin_id: coin_id.to_string(),
            retry,
        }
    }

    pub async fn usd_price(&self) -> Result<f64> {
        let url = format!("{}/simple/price", self.base_url);
        let params = [
            ("ids", self.coin_id.clone()),
            ("vs_currencies", "usd".to_string()),
        ];
        let prices: HashMap<String, HashMap<String, f64>> =
            get_json(&self.http, &url, &params, self.retry).await?;
        extract_usd(&prices, &self.coin_id)
    }
}

fn extract_usd(prices: &HashMap<String, HashMap<String, f64>>, coin_id: &str) -> Result<f64> {
    prices
        .get(coin_id)
        .and_then(|quotes| quotes.get("usd"))
        .copied()
        .ok_or_else(|| UpstreamError::MissingField(format!("{}.usd", coin_id)))
}
