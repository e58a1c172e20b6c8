//! Client for the Prometheus HTTP query API.
//!
//! Only the two read endpoints the dashboard needs are covered:
//! `/api/v1/query` (instant vectors) and `/api/v1/query_range` (matrices).

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{Result, UpstreamError},
    http::{get_with_retry, RetryPolicy},
};

/// One series of an instant-query result.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantSample {
    pub labels: HashMap<String, String>,
    /// Evaluation time, Unix seconds
    pub timestamp: u64,
    pub value: f64,
}

impl InstantSample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// One series of a range-query result.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSeries {
    pub labels: HashMap<String, String>,
    /// `(unix_secs, value)` in ascending time order
    pub samples: Vec<(u64, f64)>,
}

impl RangeSeries {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    data: Option<QueryData>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum QueryData {
    Vector(Vec<VectorEntry>),
    Matrix(Vec<MatrixEntry>),
    Scalar(RawSample),
    String(RawSample),
}

#[derive(Debug, Deserialize)]
struct VectorEntry {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: RawSample,
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    values: Vec<RawSample>,
}

/// `[<unix_time>, "<value>"]`
#[derive(Debug, Deserialize)]
struct RawSample(f64, String);

impl RawSample {
    /// Finite samples only; Prometheus encodes NaN/Inf as strings.
    fn parse(&self) -> Option<(u64, f64)> {
        let value: f64 = self.1.parse().ok()?;
        if !value.is_finite() || !self.0.is_finite() || self.0 < 0.0 {
            return None;
        }
        Some((self.0 as u64, value))
    }
}

fn decode(body: &[u8]) -> Result<QueryData> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.status != "success" {
        return Err(UpstreamError::Query {
            error_type: envelope.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: envelope.error.unwrap_or_default(),
        });
    }
    envelope
        .data
        .ok_or_else(|| UpstreamError::MissingField("data".to_string()))
}

pub(crate) fn parse_instant(body: &[u8]) -> Result<Vec<InstantSample>> {
    match decode(body)? {
        QueryData::Vector(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let (timestamp, value) = entry.value.parse()?;
                Some(InstantSample {
                    labels: entry.metric,
                    timestamp,
                    value,
                })
            })
            .collect()),
        QueryData::Scalar(sample) => Ok(sample
            .parse()
            .map(|(timestamp, value)| InstantSample {
                labels: HashMap::new(),
                timestamp,
                value,
            })
            .into_iter()
            .collect()),
        QueryData::Matrix(_) => Err(UpstreamError::UnexpectedResultType("matrix".to_string())),
        QueryData::String(_) => Err(UpstreamError::UnexpectedResultType("string".to_string())),
    }
}

pub(crate) fn parse_range(body: &[u8]) -> Result<Vec<RangeSeries>> {
    match decode(body)? {
        QueryData::Matrix(entries) => Ok(entries
            .into_iter()
            .map(|entry| RangeSeries {
                labels: entry.metric,
                samples: entry.values.iter().filter_map(RawSample::parse).collect(),
            })
            .collect()),
        QueryData::Vector(_) => Err(UpstreamError::UnexpectedResultType("vector".to_string())),
        QueryData::Scalar(_) => Err(UpstreamError::UnexpectedResultType("scalar".to_string())),
        QueryData::String(_) => Err(UpstreamError::UnexpectedResultType("string".to_string())),
    }
}

pub struct PrometheusClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PrometheusClient {
    pub fn new(base_url: &str, http: Client, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Evaluate `expr` at the current time.
    pub async fn query(&self, expr: &str) -> Result<Vec<InstantSample>> {
        debug!("Prometheus query: {}", expr);
        let url = format!("{}/api/v1/query", self.base_url);
        let (_, body) =
            get_with_retry(&self.http, &url, &[("query", expr.to_string())], self.retry).await?;
        parse_instant(&body)
    }

    /// Evaluate `expr` over `[start, end]` at `step` second resolution.
    pub async fn query_range(
        &self,
        expr: &str,
        start: u64,
        end: u64,
        step: u64,
    ) -> Result<Vec<RangeSeries>> {
        debug!(
            "Prometheus range query: {} start={} end={} step={}",
            expr, start, end, step
        );
        let url = format!("{}/api/v1/query_range", self.base_url);
        let params = [
            ("query", expr.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("step", step.to_string()),
        ];
        let (_, body) = get_with_retry(&self.http, &url, &params, self.retry).await?;
        parse_range(&body)
    }
}
