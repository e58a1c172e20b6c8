use std::convert::Infallible;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use pool_metrics::{
    parse_range, unix_timestamp, AggregatedPayout, BlockRecord, HashrateHistory, MinerSummary,
    PoolOverview,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::{error::DashboardError, DashboardCache, DashboardService};
use web_assets::icons::{kaspa_favicon_inline_svg, nav_icon_css};
use web_utils::{
    format_elapsed_time, format_kas, format_optional_hashrate, format_usd, shorten_hash,
    PLACEHOLDER,
};

static DASHBOARD_PAGE_HTML: OnceLock<String> = OnceLock::new();
static MINER_PAGE_HTML: OnceLock<String> = OnceLock::new();

const DASHBOARD_PAGE_TEMPLATE: &str = include_str!("../templates/dashboard.html");
const MINER_PAGE_TEMPLATE: &str = include_str!("../templates/miner.html");

const DEFAULT_RANGE: &str = "24h";
const DEFAULT_BLOCK_LIMIT: usize = 20;
const DEFAULT_PAYOUT_LIMIT: usize = 50;
const DEFAULT_SHARE_DAYS: u64 = 7;
const HASH_DISPLAY_CHARS: usize = 8;

type HttpResponse = Response<Full<Bytes>>;

/// Everything a request handler needs.
pub struct AppState {
    pub service: Arc<DashboardService>,
    pub cache: Arc<DashboardCache>,
    pub client_poll_interval_secs: u64,
    pub stale_threshold_secs: u64,
}

pub async fn run_http_server(
    address: String,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&address).await?;
    info!("🌐 Kaspa pool dashboard listening on http://{}", address);
    info!(
        "Client polling interval: {} seconds",
        state.client_poll_interval_secs
    );

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { handle_request(req, state).await }
            });

            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();
    Ok(route(req.method(), &path, &query, &state).await)
}

/// Dispatch one request. `query` is the raw query string without `?`.
pub async fn route(method: &Method, path: &str, query: &str, state: &AppState) -> HttpResponse {
    if *method != Method::GET {
        return method_not_allowed();
    }

    let result = match path {
        "/favicon.ico" | "/favicon.svg" => Ok(respond(
            StatusCode::OK,
            "image/svg+xml",
            Bytes::from_static(kaspa_favicon_inline_svg().as_bytes()),
        )),
        "/" => Ok(html(dashboard_page(state.client_poll_interval_secs))),
        "/miner" => Ok(html(miner_page(state.client_poll_interval_secs))),
        "/health" => Ok(serve_health(state)),
        "/api/pool" => serve_pool_overview(state),
        "/api/pool/hashrate" => serve_pool_hashrate(state, query).await,
        "/api/pool/blocks" => serve_blocks(state, query).await,
        "/api/pool/payouts" => serve_pool_payouts(state, query).await,
        "/api/network" => serve_network(state).await,
        "/api/price" => serve_price(state).await,
        path if path.starts_with("/api/miner/") => {
            serve_miner(state, &path["/api/miner/".len()..], query).await
        }
        _ => Ok(not_found()),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

fn dashboard_page(client_poll_interval_secs: u64) -> Bytes {
    let html = DASHBOARD_PAGE_HTML
        .get_or_init(|| render_template(DASHBOARD_PAGE_TEMPLATE, client_poll_interval_secs));
    Bytes::from(html.clone())
}

fn miner_page(client_poll_interval_secs: u64) -> Bytes {
    let html = MINER_PAGE_HTML
        .get_or_init(|| render_template(MINER_PAGE_TEMPLATE, client_poll_interval_secs));
    Bytes::from(html.clone())
}

fn render_template(template: &str, client_poll_interval_secs: u64) -> String {
    let interval_ms = client_poll_interval_secs.max(1) * 1000;
    template
        .replace("/* {{NAV_ICON_CSS}} */", nav_icon_css())
        .replace("{client_poll_interval_ms}", &interval_ms.to_string())
}

fn serve_health(state: &AppState) -> HttpResponse {
    let stale = state.cache.is_stale(state.stale_threshold_secs);
    let status_code = if stale {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    json_response(
        status_code,
        &json!({
            "healthy": !stale,
            "stale": stale
        }),
    )
}

fn serve_pool_overview(state: &AppState) -> Result<HttpResponse, DashboardError> {
    let overview = state.cache.get().ok_or(DashboardError::NoData)?;
    Ok(json_response(
        StatusCode::OK,
        &overview_json(&overview, unix_timestamp()),
    ))
}

async fn serve_pool_hashrate(state: &AppState, query: &str) -> Result<HttpResponse, DashboardError> {
    let range_secs = range_param(query)?;
    let history = state.service.pool_hashrate_history(range_secs).await?;
    Ok(json_response(StatusCode::OK, &history_json(&history)))
}

async fn serve_blocks(state: &AppState, query: &str) -> Result<HttpResponse, DashboardError> {
    let limit = usize_param(query, "limit", DEFAULT_BLOCK_LIMIT)?;
    let blocks = state.service.recent_blocks(limit).await?;
    let now = unix_timestamp();
    let blocks: Vec<Value> = blocks.iter().map(|block| block_json(block, now)).collect();
    Ok(json_response(StatusCode::OK, &json!({ "blocks": blocks })))
}

async fn serve_pool_payouts(state: &AppState, query: &str) -> Result<HttpResponse, DashboardError> {
    let limit = usize_param(query, "limit", DEFAULT_PAYOUT_LIMIT)?;
    let payouts = state.service.recent_payouts(limit).await?;
    Ok(json_response(StatusCode::OK, &payouts_json(&payouts)))
}

async fn serve_network(state: &AppState) -> Result<HttpResponse, DashboardError> {
    let network = state.service.network_info().await?;
    let network_hashrate_ghs = network.network_hashrate_ths.map(|ths| ths * 1000.0);
    Ok(json_response(
        StatusCode::OK,
        &with_display(
            &network,
            json!({ "network_hashrate": format_optional_hashrate(network_hashrate_ghs) }),
        ),
    ))
}

async fn serve_price(state: &AppState) -> Result<HttpResponse, DashboardError> {
    let usd = state.service.price_usd().await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "usd": usd, "display": format_usd(usd) }),
    ))
}

async fn serve_miner(
    state: &AppState,
    rest: &str,
    query: &str,
) -> Result<HttpResponse, DashboardError> {
    let (wallet, endpoint) = rest.split_once('/').unwrap_or((rest, ""));
    let wallet = percent_decode(wallet);

    match endpoint {
        "" => {
            let summary = state.service.miner_summary(&wallet).await?;
            Ok(json_response(
                StatusCode::OK,
                &summary_json(&summary, unix_timestamp()),
            ))
        }
        "hashrate" => {
            let range_secs = range_param(query)?;
            let history = state
                .service
                .miner_hashrate_history(&wallet, range_secs)
                .await?;
            Ok(json_response(StatusCode::OK, &history_json(&history)))
        }
        "shares" => {
            let days = u64_param(query, "days", DEFAULT_SHARE_DAYS)?;
            let days = state.service.miner_daily_shares(&wallet, days).await?;
            Ok(json_response(StatusCode::OK, &json!({ "days": days })))
        }
        "payouts" => {
            let payouts = state.service.miner_payouts(&wallet).await?;
            Ok(json_response(StatusCode::OK, &payouts_json(&payouts)))
        }
        "payouts.csv" => {
            let csv = state.service.miner_payouts_csv(&wallet).await?;
            let filename = format!(
                "payouts-{}.csv",
                wallet.trim().to_ascii_lowercase().replace(':', "-")
            );
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "text/csv; charset=utf-8")
                .header(
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .body(Full::new(Bytes::from(csv)))
                .unwrap_or_else(|_| internal_error()))
        }
        _ => Ok(not_found()),
    }
}

fn overview_json(overview: &PoolOverview, now: u64) -> Value {
    let network_hashrate_ghs = overview
        .network
        .as_ref()
        .and_then(|n| n.network_hashrate_ths)
        .map(|ths| ths * 1000.0);
    with_display(
        overview,
        json!({
            "pool_hashrate": format_optional_hashrate(overview.pool_hashrate_ghs),
            "network_hashrate": format_optional_hashrate(network_hashrate_ghs),
            "price": overview.price_usd.map(format_usd).unwrap_or_else(|| PLACEHOLDER.to_string()),
            "updated": format_elapsed_time(now, overview.timestamp),
        }),
    )
}

fn history_json(history: &HashrateHistory) -> Value {
    with_display(
        history,
        json!({ "smoothed": format_optional_hashrate(history.smoothed_ghs) }),
    )
}

fn block_json(block: &BlockRecord, now: u64) -> Value {
    with_display(
        block,
        json!({
            "short_hash": shorten_hash(&block.hash, HASH_DISPLAY_CHARS),
            "reward": block.reward_sompi.map(format_kas).unwrap_or_else(|| PLACEHOLDER.to_string()),
            "found": format_elapsed_time(now, block.timestamp_ms / 1000),
        }),
    )
}

fn payouts_json(payouts: &[AggregatedPayout]) -> Value {
    let now = unix_timestamp();
    let payouts: Vec<Value> = payouts
        .iter()
        .map(|payout| {
            with_display(
                payout,
                json!({
                    "short_tx": shorten_hash(&payout.tx_hash, HASH_DISPLAY_CHARS),
                    "amount": format_kas(payout.amount_sompi),
                    "paid": format_elapsed_time(now, payout.timestamp_secs),
                }),
            )
        })
        .collect();
    json!({ "payouts": payouts })
}

fn summary_json(summary: &MinerSummary, now: u64) -> Value {
    let workers: Vec<Value> = summary
        .workers
        .iter()
        .map(|worker| {
            with_display(
                worker,
                json!({
                    "hashrate": format_optional_hashrate(Some(worker.hashrate_ghs)),
                    "hashrate_1h": format_optional_hashrate(worker.hashrate_1h_ghs),
                    "hashrate_24h": format_optional_hashrate(worker.hashrate_24h_ghs),
                    "last_seen": worker
                        .last_seen
                        .map(|ts| format_elapsed_time(now, ts))
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                }),
            )
        })
        .collect();

    let mut value = with_display(
        summary,
        json!({
            "total_hashrate": format_optional_hashrate(Some(summary.total_hashrate_ghs)),
            "balance": summary.balance_sompi.map(format_kas).unwrap_or_else(|| PLACEHOLDER.to_string()),
            "total_paid": summary.total_paid_sompi.map(format_kas).unwrap_or_else(|| PLACEHOLDER.to_string()),
        }),
    );
    if let Value::Object(map) = &mut value {
        map.insert("workers".to_string(), Value::Array(workers));
    }
    value
}

/// Serialize `value` and attach preformatted strings under `display`.
fn with_display<T: Serialize>(value: &T, display: Value) -> Value {
    let mut json = serde_json::to_value(value).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut json {
        map.insert("display".to_string(), display);
    }
    json
}

fn range_param(query: &str) -> Result<u64, DashboardError> {
    let raw = query_param(query, "range").unwrap_or_else(|| DEFAULT_RANGE.to_string());
    Ok(parse_range(&raw)?)
}

fn usize_param(query: &str, name: &'static str, default: usize) -> Result<usize, DashboardError> {
    match query_param(query, name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DashboardError::invalid_parameter(name, "must be a positive integer")),
    }
}

fn u64_param(query: &str, name: &'static str, default: u64) -> Result<u64, DashboardError> {
    match query_param(query, name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DashboardError::invalid_parameter(name, "must be a positive integer")),
    }
}

/// First value of `key` in a raw query string, percent-decoded.
fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| percent_decode(v))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(high), Some(low)) => {
                    decoded.push(high << 4 | low);
                    i += 2;
                }
                _ => decoded.push(b'%'),
            },
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

fn respond(status: StatusCode, content_type: &str, body: Bytes) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body))
        .unwrap_or_else(|_| internal_error())
}

fn html(body: Bytes) -> HttpResponse {
    respond(StatusCode::OK, "text/html; charset=utf-8", body)
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, "application/json", Bytes::from(body)),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            internal_error()
        }
    }
}

fn error_response(err: &DashboardError) -> HttpResponse {
    let status = err.status_code();
    if status.is_server_error() {
        warn!("Request failed: {}", err);
    } else {
        debug!("Rejected request: {}", err);
    }
    json_response(status, &json!({ "error": err.to_string() }))
}

fn not_found() -> HttpResponse {
    json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))
}

fn method_not_allowed() -> HttpResponse {
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "error": "Method not allowed" }),
    );
    response
        .headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static("GET"));
    response
}

fn internal_error() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"error":"Internal server error"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
