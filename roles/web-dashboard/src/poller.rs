use std::{sync::Arc, time::Duration};

use tokio::time;
use tracing::{error, info};

use crate::{error::Result, DashboardCache, DashboardService};

/// Fetch the pool overview once and store it.
pub async fn refresh_overview(service: &DashboardService, cache: &DashboardCache) -> Result<()> {
    let overview = service.pool_overview().await?;
    cache.update(overview);
    Ok(())
}

/// Refresh the cached overview every `interval_secs`, forever.
///
/// Only transitions between success and failure are logged.
pub async fn poll_pool_overview(
    service: Arc<DashboardService>,
    cache: Arc<DashboardCache>,
    interval_secs: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut last_success: Option<bool> = None;

    loop {
        interval.tick().await;

        match refresh_overview(&service, &cache).await {
            Ok(()) => {
                if last_success != Some(true) {
                    info!("Successfully fetched pool overview");
                }
                last_success = Some(true);
            }
            Err(e) => {
                if last_success != Some(false) {
                    error!("Failed to refresh pool overview: {}", e);
                }
                last_success = Some(false);
            }
        }
    }
}
