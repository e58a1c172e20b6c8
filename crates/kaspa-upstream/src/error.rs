use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("Query error ({error_type}): {message}")]
    Query { error_type: String, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unexpected result type: {0}")]
    UnexpectedResultType(String),
}

pub type Result<T> = std::result::Result<T, UpstreamError>;
