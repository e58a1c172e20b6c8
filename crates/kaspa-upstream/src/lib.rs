pub mod de;
pub mod error;
pub mod explorer;
pub mod http;
pub mod price;
pub mod prometheus;
pub mod source;

pub use error::UpstreamError;
pub use explorer::{BlockDagInfo, CoinSupply, ExplorerBlock, ExplorerClient};
pub use http::{build_http_client, RetryPolicy};
pub use price::PriceClient;
pub use prometheus::{InstantSample, PrometheusClient, RangeSeries};
pub use source::{ExplorerSource, MetricsSource, PriceSource};
