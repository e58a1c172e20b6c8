use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pool_metrics::{unix_timestamp, PoolOverview};

pub mod args;
pub mod config;
pub mod error;
pub mod poller;
pub mod service;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::DashboardError;
pub use service::DashboardService;

/// Latest pool overview, written by the poller and read by `/api/pool` and `/health`.
///
/// The overview fans out to every upstream, so requests are served from this
/// copy instead; its age is what `/health` reports as stale.
pub struct DashboardCache {
    overview: Arc<RwLock<Option<PoolOverview>>>,
}

impl DashboardCache {
    pub fn new() -> Self {
        Self {
            overview: Arc::new(RwLock::new(None)),
        }
    }

    pub fn update(&self, overview: PoolOverview) {
        if let Ok(mut guard) = self.overview.write() {
            *guard = Some(overview);
        }
    }

    pub fn get(&self) -> Option<PoolOverview> {
        self.overview.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_stale(&self, threshold_secs: u64) -> bool {
        match self.get() {
            Some(overview) => unix_timestamp().saturating_sub(overview.timestamp) > threshold_secs,
            None => true,
        }
    }
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Block hash to coinbase reward (sompi).
///
/// Rewards never change once a block is accepted, so entries are only
/// dropped when the map reaches capacity, and then all at once.
pub struct BlockRewardCache {
    capacity: usize,
    rewards: RwLock<HashMap<String, u64>>,
}

impl BlockRewardCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rewards: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, hash: &str) -> Option<u64> {
        self.rewards
            .read()
            .ok()
            .and_then(|guard| guard.get(hash).copied())
    }

    pub fn insert(&self, hash: String, reward_sompi: u64) {
        if let Ok(mut guard) = self.rewards.write() {
            if guard.len() >= self.capacity && !guard.contains_key(&hash) {
                guard.clear();
            }
            guard.insert(hash, reward_sompi);
        }
    }

    pub fn len(&self) -> usize {
        self.rewards.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
