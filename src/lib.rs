//! Google Cloud Monitoring receiver
//!
//! Pulls configured metric types from the Cloud Monitoring v3 API on a fixed
//! interval and converts them into OpenTelemetry metrics documents.
//!
//! # Features
//!
//! - Descriptor cache populated once at startup
//! - Lazy, page-at-a-time time-series retrieval with cancellation
//! - Gauge, cumulative and delta conversion into OTLP datapoints
//! - Configurable via YAML, environment variables, or programmatic API
//! - Optional forwarding to an OTLP/HTTP endpoint
//!
//! # Example
//!
//! ```no_run
//! use gcp_monitoring_receiver::{ConfigBuilder, MetricConfig, MonitoringReceiver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gcp_monitoring_receiver::ReceiverError> {
//! let config = ConfigBuilder::new()
//!     .project_id("my-project")
//!     .metric(MetricConfig::new("compute.googleapis.com/instance/cpu/usage_time", 60))
//!     .access_token_file("/var/run/secrets/gcp-token")
//!     .build()?;
//!
//! let receiver = MonitoringReceiver::new(config);
//! let cancel = CancellationToken::new();
//! receiver.start(&cancel).await?;
//!
//! let document = receiver.scrape(&cancel).await.map_err(|p| p.source)?;
//! let request = document.to_protobuf();
//! # let _ = request;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod monitoring;
pub mod otlp;
pub mod scrape;

// Re-export public API
pub use config::{
    AuthConfig, Config, ConfigBuilder, ConfigLoader, CredentialsConfig, ForwardingConfig,
    MetricConfig, ResourceGrouping,
};
pub use error::{
    ApiError, ConfigError, ExportError, PartialScrape, ReceiverError, ScrapeError, StartupError,
};
pub use monitoring::{MonitoringApi, MonitoringClient};
pub use otlp::{MetricsDocument, OtlpForwarder};
pub use scrape::MonitoringReceiver;

// Initialize tracing subscriber for structured logging
use tracing_subscriber::EnvFilter;

/// Initialize structured logging
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
