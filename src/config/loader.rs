//! Configuration loader
//!
//! Loads configuration from YAML files, environment variables, or programmatic API.
//! Priority: environment variables > provided config > defaults

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::config::types::{Config, ForwardingConfig, ResourceGrouping};
use crate::error::ConfigError;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from YAML file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        info!(
            config_path = %path.display(),
            "Loading configuration from YAML file"
        );

        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to read configuration file"
            );
            ConfigError::Read(format!("{}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_yaml::from_str(&content).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to parse YAML configuration"
            );
            ConfigError::ValidationFailed(format!("Failed to parse YAML: {}", e))
        })?;

        debug!(
            config_path = %path.display(),
            metrics = config.metrics_list.len(),
            "Parsed YAML configuration"
        );

        Self::apply_env_overrides(&mut config);
        Self::validated(config)
    }

    /// Load configuration from environment variables
    ///
    /// The metric list cannot be expressed in the environment, so this only
    /// succeeds when `GCM_METRICS` names at least one metric type
    /// (comma-separated, default fetch delay).
    pub fn from_env() -> Result<Config, ConfigError> {
        info!("Loading configuration from environment variables");

        let mut config = Config::default();
        Self::apply_env_overrides(&mut config);
        Self::validated(config)
    }

    /// Load configuration with priority: environment variables > provided config > defaults
    pub fn load(provided: Option<Config>) -> Result<Config, ConfigError> {
        let mut config = provided.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Self::validated(config)
    }

    fn validated(config: Config) -> Result<Config, ConfigError> {
        config.validate().map_err(|e| {
            warn!(error = %e, "Configuration validation failed");
            e
        })?;

        info!(
            project_id = %config.project_id,
            collection_interval_secs = config.collection_interval_secs,
            metrics = config.metrics_list.len(),
            resource_grouping = ?config.resource_grouping,
            forwarding_enabled = config.forwarding.as_ref().is_some_and(|f| f.enabled),
            "Configuration loaded and validated successfully"
        );

        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(project_id) = env::var("GCM_PROJECT_ID") {
            debug!(env_var = "GCM_PROJECT_ID", value = %project_id, "Applying environment variable override");
            config.project_id = project_id;
        }

        if let Some(secs) = parse_env::<u64>("GCM_COLLECTION_INTERVAL_SECS") {
            config.collection_interval_secs = secs;
        }

        if let Some(secs) = parse_env::<u64>("GCM_INITIAL_DELAY_SECS") {
            config.initial_delay_secs = secs;
        }

        if let Some(secs) = parse_env::<u64>("GCM_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }

        if let Ok(endpoint) = env::var("GCM_ENDPOINT") {
            debug!(env_var = "GCM_ENDPOINT", value = %endpoint, "Applying environment variable override");
            config.endpoint = endpoint;
        }

        if let Ok(metrics) = env::var("GCM_METRICS") {
            let names: Vec<_> = metrics
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| crate::config::MetricConfig::new(name, 0))
                .collect();
            debug!(env_var = "GCM_METRICS", count = names.len(), "Applying environment variable override");
            config.metrics_list = names;
        }

        if let Ok(token) = env::var("GCM_ACCESS_TOKEN") {
            debug!(env_var = "GCM_ACCESS_TOKEN", "Applying environment variable override");
            config.credentials.access_token = Some(SecretString::new(token));
        }

        if let Ok(path) = env::var("GCM_ACCESS_TOKEN_FILE") {
            debug!(env_var = "GCM_ACCESS_TOKEN_FILE", value = %path, "Applying environment variable override");
            config.credentials.access_token_file = Some(PathBuf::from(path));
        }

        if let Ok(grouping) = env::var("GCM_RESOURCE_GROUPING") {
            match grouping.to_lowercase().as_str() {
                "per_series" => config.resource_grouping = ResourceGrouping::PerSeries,
                "merged" => config.resource_grouping = ResourceGrouping::Merged,
                other => warn!(
                    env_var = "GCM_RESOURCE_GROUPING",
                    value = %other,
                    "Unknown resource grouping, keeping configured value"
                ),
            }
        }

        if let Some(enabled) = parse_env::<bool>("GCM_FORWARDING_ENABLED") {
            let mut forwarding = config.forwarding.take().unwrap_or_default();
            forwarding.enabled = enabled;
            if let Ok(url) = env::var("GCM_FORWARDING_ENDPOINT_URL") {
                forwarding.endpoint_url = Some(url);
            }
            config.forwarding = Some(forwarding);
        } else if let Ok(url) = env::var("GCM_FORWARDING_ENDPOINT_URL") {
            if let Some(ForwardingConfig { endpoint_url, .. }) = config.forwarding.as_mut() {
                *endpoint_url = Some(url);
            }
        }
    }
}

fn parse_env<T>(name: &'static str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => {
            debug!(env_var = name, value = %raw, "Applying environment variable override");
            Some(value)
        }
        Err(e) => {
            warn!(
                env_var = name,
                value = %raw,
                error = %e,
                "Failed to parse environment variable, keeping configured value"
            );
            None
        }
    }
}
