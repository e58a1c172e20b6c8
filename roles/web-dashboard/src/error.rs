use hyper::StatusCode;
use kaspa_upstream::UpstreamError;
use pool_metrics::{AddressError, RangeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Invalid range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("No data available yet")]
    NoData,
}

impl DashboardError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAddress(_) | Self::InvalidRange(_) | Self::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoData => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
