//! Shared HTTP plumbing: client construction and fixed-count retries.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{Result, UpstreamError};

/// Fixed retry schedule applied to every upstream GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Build the pooled client shared by all upstream clients.
pub fn build_http_client(
    request_timeout: Duration,
    pool_idle_timeout: Duration,
) -> Result<Client> {
    Ok(Client::builder()
        .timeout(request_timeout)
        .pool_idle_timeout(pool_idle_timeout)
        .pool_max_idle_per_host(4)
        .user_agent(concat!("kaspa-pool-dashboard/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// GET `url` with `query`, retrying transport failures, 5xx and 429.
///
/// Returns the final status and body. Non-retryable statuses (including
/// 4xx error bodies some APIs use to explain a bad request) are returned to
/// the caller as-is; only a retryable status that persists through the last
/// attempt becomes `UpstreamError::Status`.
pub(crate) async fn get_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    policy: RetryPolicy,
) -> Result<(StatusCode, Vec<u8>)> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match client.get(url).query(query).send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable(status) {
                    let body = response.bytes().await?;
                    return Ok((status, body.to_vec()));
                }
                UpstreamError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                }
            }
            Err(e) => UpstreamError::Http(e),
        };

        if attempt >= attempts {
            warn!("Giving up on {} after {} attempts: {}", url, attempts, error);
            return Err(error);
        }
        debug!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, error);
        tokio::time::sleep(policy.delay).await;
    }
}

/// GET and decode a JSON body, failing on any non-success status.
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    policy: RetryPolicy,
) -> Result<T> {
    let (status, body) = get_with_retry(client, url, query, policy).await?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(serde_json::from_slice(&body)?)
}
