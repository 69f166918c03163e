//! Unit tests for environment variable configuration loading

use gcp_monitoring_receiver::config::{Config, ConfigLoader, MetricConfig, ResourceGrouping};
use gcp_monitoring_receiver::error::ConfigError;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Mutex;

// Environment variables are process-wide, so parallel tests can interfere with each other
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_gcm_env_vars() {
    for name in [
        "GCM_PROJECT_ID",
        "GCM_COLLECTION_INTERVAL_SECS",
        "GCM_INITIAL_DELAY_SECS",
        "GCM_REQUEST_TIMEOUT_SECS",
        "GCM_ENDPOINT",
        "GCM_METRICS",
        "GCM_ACCESS_TOKEN",
        "GCM_ACCESS_TOKEN_FILE",
        "GCM_RESOURCE_GROUPING",
        "GCM_FORWARDING_ENABLED",
        "GCM_FORWARDING_ENDPOINT_URL",
    ] {
        unsafe { std::env::remove_var(name) };
    }
}

fn set(name: &str, value: &str) {
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn test_load_from_env_with_all_vars() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_gcm_env_vars();

    set("GCM_PROJECT_ID", "env-project");
    set("GCM_COLLECTION_INTERVAL_SECS", "180");
    set("GCM_INITIAL_DELAY_SECS", "0");
    set("GCM_REQUEST_TIMEOUT_SECS", "15");
    set("GCM_ENDPOINT", "http://localhost:8085");
    set(
        "GCM_METRICS",
        "compute.googleapis.com/instance/cpu/usage_time, pubsub.googleapis.com/topic/send_request_count",
    );
    set("GCM_ACCESS_TOKEN", "ya29.token");
    set("GCM_ACCESS_TOKEN_FILE", "/tmp/token");
    set("GCM_RESOURCE_GROUPING", "MERGED");

    let config = ConfigLoader::from_env().unwrap();

    assert_eq!(config.project_id, "env-project");
    assert_eq!(config.collection_interval_secs, 180);
    assert_eq!(config.initial_delay_secs, 0);
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.endpoint, "http://localhost:8085");
    assert_eq!(
        config.metrics_list,
        vec![
            MetricConfig::new("compute.googleapis.com/instance/cpu/usage_time", 0),
            MetricConfig::new("pubsub.googleapis.com/topic/send_request_count", 0),
        ]
    );
    assert_eq!(
        config.credentials.access_token.as_ref().unwrap().expose_secret(),
        "ya29.token"
    );
    assert_eq!(
        config.credentials.access_token_file,
        Some(PathBuf::from("/tmp/token"))
    );
    assert_eq!(config.resource_grouping, ResourceGrouping::Merged);

    clear_gcm_env_vars();
}

#[test]
fn test_load_from_env_without_metrics_fails() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_gcm_env_vars();

    set("GCM_PROJECT_ID", "env-project");

    assert!(matches!(
        ConfigLoader::from_env(),
        Err(ConfigError::MissingRequiredField(_))
    ));

    clear_gcm_env_vars();
}

#[test]
fn test_load_from_env_with_invalid_values() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_gcm_env_vars();

    set("GCM_PROJECT_ID", "env-project");
    set("GCM_METRICS", "compute.googleapis.com/instance/cpu/usage_time");
    // Unparseable values are ignored and the default is kept
    set("GCM_COLLECTION_INTERVAL_SECS", "not_a_number");
    set("GCM_RESOURCE_GROUPING", "sideways");

    let config = ConfigLoader::from_env().unwrap();

    assert_eq!(config.collection_interval_secs, 300);
    assert_eq!(config.resource_grouping, ResourceGrouping::PerSeries);

    clear_gcm_env_vars();
}

#[test]
fn test_load_from_env_with_forwarding() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_gcm_env_vars();

    set("GCM_PROJECT_ID", "env-project");
    set("GCM_METRICS", "compute.googleapis.com/instance/cpu/usage_time");
    set("GCM_FORWARDING_ENABLED", "true");
    set("GCM_FORWARDING_ENDPOINT_URL", "https://otlp.example.com");

    let config = ConfigLoader::from_env().unwrap();

    let forwarding = config.forwarding.as_ref().unwrap();
    assert!(forwarding.enabled);
    assert_eq!(
        forwarding.endpoint_url.as_deref(),
        Some("https://otlp.example.com")
    );

    clear_gcm_env_vars();
}

#[test]
fn test_load_with_provided_config_and_env_priority() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_gcm_env_vars();

    let provided = Config {
        project_id: "provided-project".to_string(),
        collection_interval_secs: 240,
        metrics_list: vec![MetricConfig::new(
            "compute.googleapis.com/instance/cpu/usage_time",
            60,
        )],
        ..Config::default()
    };

    set("GCM_COLLECTION_INTERVAL_SECS", "900");

    let config = ConfigLoader::load(Some(provided)).unwrap();

    assert_eq!(config.project_id, "provided-project");
    assert_eq!(config.collection_interval_secs, 900);
    assert_eq!(config.metrics_list[0].fetch_delay_secs, 60);

    clear_gcm_env_vars();
}
