//! Configuration type definitions
//!
//! Defines all configuration structures for the GCP Monitoring receiver.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Smallest collection interval accepted by [`Config::validate`]
pub const MIN_COLLECTION_INTERVAL_SECS: u64 = 60;

/// A metric type to scrape and how far behind real time its window ends
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricConfig {
    /// Fully qualified metric type, e.g. `compute.googleapis.com/instance/cpu/usage_time`
    pub metric_name: String,

    /// Delay in seconds applied to the end of the sample window (0 selects the default)
    #[serde(default)]
    pub fetch_delay_secs: u64,
}

impl MetricConfig {
    /// Create a metric entry
    pub fn new(metric_name: impl Into<String>, fetch_delay_secs: u64) -> Self {
        Self {
            metric_name: metric_name.into(),
            fetch_delay_secs,
        }
    }

    /// Fetch delay as a [`Duration`]
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_delay_secs)
    }

    /// Validate a single metric entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metric_name.trim().is_empty() {
            return Err(ConfigError::InvalidMetric(
                "metric_name cannot be empty".to_string(),
            ));
        }
        if self.metric_name.contains('"') {
            return Err(ConfigError::InvalidMetric(format!(
                "metric_name cannot contain quotes: {}",
                self.metric_name
            )));
        }
        Ok(())
    }
}

/// How raw series are grouped into resource nodes within one scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGrouping {
    /// Every series gets its own resource node
    #[default]
    PerSeries,
    /// Series with identical resource identity share a resource node
    Merged,
}

/// Where the bearer token for the monitoring API comes from
///
/// With neither field set, application default credentials are used.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Inline access token
    #[serde(default, skip_serializing)]
    pub access_token: Option<SecretString>,

    /// File containing an access token (e.g. written by `gcloud auth print-access-token`)
    #[serde(default)]
    pub access_token_file: Option<PathBuf>,
}

/// Main configuration structure for the receiver
///
/// # Configuration Sources
///
/// Configuration can be loaded from:
/// - YAML files
/// - Environment variables (with `GCM_*` prefix)
/// - Programmatic API (using `ConfigBuilder`)
///
/// # Default Values
///
/// - `collection_interval_secs`: `300`
/// - `initial_delay_secs`: `1`
/// - `endpoint`: `https://monitoring.googleapis.com`
/// - `request_timeout_secs`: `30`
/// - `resource_grouping`: `per_series`
/// - `forwarding`: Disabled by default
///
/// # Example
///
/// ```no_run
/// use gcp_monitoring_receiver::{ConfigBuilder, MetricConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigBuilder::new()
///     .project_id("my-project-id")
///     .collection_interval_secs(120)
///     .metric(MetricConfig::new("compute.googleapis.com/instance/cpu/usage_time", 60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Google Cloud project to scrape
    #[serde(default)]
    pub project_id: String,

    /// Scrape interval and window length in seconds (default: 300)
    #[serde(default = "default_collection_interval_secs")]
    pub collection_interval_secs: u64,

    /// Delay before the first scrape in seconds (default: 1)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Metric types to scrape, processed in this order
    #[serde(default)]
    pub metrics_list: Vec<MetricConfig>,

    /// Base URL of the monitoring API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Credential sources
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Resource grouping mode
    #[serde(default)]
    pub resource_grouping: ResourceGrouping,

    /// Optional OTLP forwarding of scraped documents
    #[serde(default)]
    pub forwarding: Option<ForwardingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            collection_interval_secs: default_collection_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            metrics_list: Vec::new(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            credentials: CredentialsConfig::default(),
            resource_grouping: ResourceGrouping::default(),
            forwarding: None,
        }
    }
}

impl Config {
    /// Collection interval as a [`Duration`]
    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingRequiredField(
                "project_id cannot be empty".to_string(),
            ));
        }

        if self.collection_interval_secs < MIN_COLLECTION_INTERVAL_SECS {
            return Err(ConfigError::InvalidInterval(format!(
                "collection interval must be at least {} seconds, got {}",
                MIN_COLLECTION_INTERVAL_SECS, self.collection_interval_secs
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidInterval(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        if self.metrics_list.is_empty() {
            return Err(ConfigError::MissingRequiredField(
                "metrics_list must contain at least one metric".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics_list {
            metric.validate()?;
            if !seen.insert(metric.metric_name.as_str()) {
                return Err(ConfigError::InvalidMetric(format!(
                    "duplicate metric_name: {}",
                    metric.metric_name
                )));
            }
        }

        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.endpoint, e)))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(
                "endpoint must use http:// or https:// scheme".to_string(),
            ));
        }

        if let Some(ref forwarding) = self.forwarding {
            forwarding.validate()?;
        }

        Ok(())
    }
}

/// Configuration for forwarding scraped documents to an OTLP/HTTP endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ForwardingConfig {
    /// Whether forwarding is enabled (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Remote OTLP endpoint URL (required if enabled)
    pub endpoint_url: Option<String>,

    /// Authentication configuration (optional)
    #[serde(default)]
    pub authentication: Option<AuthConfig>,
}

impl ForwardingConfig {
    /// Validate forwarding configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        let Some(ref url) = self.endpoint_url else {
            return Err(ConfigError::MissingRequiredField(
                "endpoint_url is required when forwarding is enabled".to_string(),
            ));
        };

        if url.is_empty() {
            return Err(ConfigError::InvalidUrl(
                "Endpoint URL cannot be empty when forwarding is enabled".to_string(),
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(
                "Endpoint URL must use http:// or https:// scheme".to_string(),
            ));
        }

        if let Some(ref auth) = self.authentication {
            auth.validate()?;
        }

        Ok(())
    }
}

/// Authentication configuration for forwarding
///
/// - **`api_key`**: requires `key`, optional `header_name` (default `X-API-Key`)
/// - **`bearer_token`**: requires `token`
/// - **`basic`**: requires `username` and `password`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Type of authentication (e.g., "api_key", "bearer_token", "basic")
    pub auth_type: String,

    /// Authentication parameters (e.g., token, key, username, password)
    #[serde(skip_serializing)]
    pub credentials: HashMap<String, SecretString>,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: &[&str] = match self.auth_type.as_str() {
            "api_key" => &["key"],
            "bearer_token" => &["token"],
            "basic" => &["username", "password"],
            "" => {
                return Err(ConfigError::ValidationFailed(
                    "Authentication type cannot be empty".to_string(),
                ));
            }
            other => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Unsupported authentication type: {}",
                    other
                )));
            }
        };

        for key in required {
            if !self.credentials.contains_key(*key) {
                return Err(ConfigError::MissingRequiredField(format!(
                    "{} required for {}",
                    key, self.auth_type
                )));
            }
        }

        Ok(())
    }
}

/// Builder for creating configurations programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the project to scrape
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = project_id.into();
        self
    }

    /// Set collection interval in seconds
    pub fn collection_interval_secs(mut self, secs: u64) -> Self {
        self.config.collection_interval_secs = secs;
        self
    }

    /// Set initial delay in seconds
    pub fn initial_delay_secs(mut self, secs: u64) -> Self {
        self.config.initial_delay_secs = secs;
        self
    }

    /// Append a metric to scrape
    pub fn metric(mut self, metric: MetricConfig) -> Self {
        self.config.metrics_list.push(metric);
        self
    }

    /// Replace the metric list
    pub fn metrics(mut self, metrics: Vec<MetricConfig>) -> Self {
        self.config.metrics_list = metrics;
        self
    }

    /// Set the monitoring API base URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the per-request timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Use an inline access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.credentials.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Read the access token from a file at startup
    pub fn access_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials.access_token_file = Some(path.into());
        self
    }

    /// Set the resource grouping mode
    pub fn resource_grouping(mut self, grouping: ResourceGrouping) -> Self {
        self.config.resource_grouping = grouping;
        self
    }

    /// Set forwarding configuration
    pub fn forwarding(mut self, forwarding: Option<ForwardingConfig>) -> Self {
        self.config.forwarding = forwarding;
        self
    }

    /// Build the configuration with validation
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Default value functions
fn default_collection_interval_secs() -> u64 {
    300
}

fn default_initial_delay_secs() -> u64 {
    1
}

fn default_endpoint() -> String {
    "https://monitoring.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
