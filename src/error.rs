//! Error types for the GCP Monitoring receiver
//!
//! Startup failures halt the receiver, scrape failures abort only the current
//! cycle, and everything else is logged and skipped.

use thiserror::Error;

use crate::otlp::metrics_data::MetricsDocument;

/// Main error type for the receiver
#[derive(Error, Debug)]
pub enum ReceiverError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while starting the receiver
    #[error("Startup error: {0}")]
    Startup(#[from] StartupError),

    /// Errors that terminated a scrape
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// Export/forwarding errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid interval value
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Missing required configuration field
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Invalid metric entry
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    /// Invalid URL format
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Read(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors raised by [`crate::scrape::MonitoringReceiver::start`]
#[derive(Error, Debug)]
pub enum StartupError {
    /// No usable access token could be resolved
    #[error("failed to resolve credentials: {0}")]
    Credentials(String),

    /// The HTTP client could not be built
    #[error("failed to create a monitoring client: {0}")]
    ClientConstruction(String),

    /// The initial metric descriptor listing failed
    #[error("failed to retrieve metric descriptors data: {0}")]
    Descriptors(#[source] ApiError),
}

/// Errors returned by the remote monitoring API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote endpoint answered with a non-success status
    #[error("remote returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// No bearer token could be obtained
    #[error("failed to obtain access token: {0}")]
    Auth(String),

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The caller cancelled the call
    #[error("request cancelled")]
    Cancelled,
}

/// Errors that terminate a scrape
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// `scrape` was called before `start` or after `shutdown`
    #[error("monitoring client is not started")]
    NotStarted,

    /// Listing time series for a metric failed
    #[error("failed to retrieve time series data for {metric_type}: {source}")]
    TimeSeries {
        /// Metric type being fetched when the failure happened
        metric_type: String,
        /// Underlying API error
        #[source]
        source: ApiError,
    },

    /// Rebuilding the descriptor cache failed; the previous cache is kept
    #[error("failed to refresh metric descriptors: {0}")]
    Descriptors(#[source] ApiError),

    /// The scrape was cancelled between or during remote calls
    #[error("scrape cancelled")]
    Cancelled,
}

/// A scrape that ended early, with whatever was converted before the failure
#[derive(Error, Debug)]
#[error("scrape aborted: {source}")]
pub struct PartialScrape {
    /// Metrics converted before the failure
    pub metrics: MetricsDocument,
    /// Terminal error of the scrape
    #[source]
    pub source: ScrapeError,
}

impl PartialScrape {
    /// Split into the partial document and the terminal error
    pub fn into_parts(self) -> (MetricsDocument, ScrapeError) {
        (self.metrics, self.source)
    }
}

/// Export/forwarding errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// The circuit breaker rejected the call without contacting the endpoint
    #[error("Circuit breaker is open: {0}")]
    CircuitOpen(String),

    /// Remote forwarding error
    #[error("Remote forwarding failed: {0}")]
    ForwardingError(String),
}
