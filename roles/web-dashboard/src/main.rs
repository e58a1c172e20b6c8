use std::sync::Arc;

use clap::Parser;
use kaspa_upstream::{build_http_client, ExplorerClient, PriceClient, PrometheusClient};
use tracing::info;

use web_dashboard::{
    args::Args,
    config::DashboardConfig,
    poller::poll_pool_overview,
    web::{run_http_server, AppState},
    DashboardCache, DashboardService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = DashboardConfig::from_args(&args)?;

    // Setup tracing with optional file output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt().with_env_filter(env_filter);

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| format!("Failed to open log file {}: {}", log_file.display(), e))?;
        fmt_layer.with_writer(Arc::new(file)).init();
    } else {
        fmt_layer.init();
    }

    info!("Starting Kaspa pool dashboard");
    info!("Prometheus URL: {}", config.upstream.prometheus_url);
    info!("Explorer URL: {}", config.upstream.explorer_url);
    info!("Price URL: {}", config.upstream.price_url);
    info!("Web server address: {}", config.server.listen_address);
    info!(
        "Overview polling interval: {} seconds",
        config.polling.overview_interval_secs
    );
    match &config.upstream.pool_address {
        Some(address) => info!("Block rewards restricted to pool address {}", address),
        None => info!("No pool address configured, block rewards count every coinbase output"),
    }

    let http = build_http_client(
        config.upstream.request_timeout(),
        config.upstream.pool_idle_timeout(),
    )?;
    let retry = config.upstream.retry_policy();

    let metrics = PrometheusClient::new(&config.upstream.prometheus_url, http.clone(), retry);
    let explorer = ExplorerClient::new(&config.upstream.explorer_url, http.clone(), retry);
    let price = PriceClient::new(
        &config.upstream.price_url,
        &config.upstream.coin_id,
        http,
        retry,
    );

    let service = Arc::new(DashboardService::new(
        Arc::new(metrics),
        Arc::new(explorer),
        Arc::new(price),
        config.queries.clone(),
        config.upstream.pool_address.clone(),
        config.polling.block_reward_cache_size,
    ));
    let cache = Arc::new(DashboardCache::new());

    // Spawn polling loop
    tokio::spawn(poll_pool_overview(
        service.clone(),
        cache.clone(),
        config.polling.overview_interval_secs,
    ));

    let state = Arc::new(AppState {
        service,
        cache,
        client_poll_interval_secs: config.polling.client_poll_interval_secs,
        stale_threshold_secs: config.polling.stale_threshold_secs,
    });

    run_http_server(config.server.listen_address.clone(), state).await
}
