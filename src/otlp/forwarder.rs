//! Remote forwarding module
//!
//! Sends scraped documents to an OTLP/HTTP endpoint as protobuf.

use crate::config::ForwardingConfig;
use crate::error::{ExportError, ReceiverError};
use crate::otlp::metrics_data::MetricsDocument;
use prost::Message;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Consecutive failures before the breaker opens
const FAILURE_THRESHOLD: u32 = 5;

/// Time an open breaker waits before letting a trial call through
const HALF_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct CircuitBreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    half_open_test_in_progress: bool,
}

impl CircuitBreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            half_open_test_in_progress: false,
        }
    }
}

/// Circuit breaker for forwarding failures
#[derive(Debug)]
struct CircuitBreaker {
    state: Mutex<CircuitBreakerState>,
    failure_threshold: u32,
    half_open_timeout: Duration,
}

impl CircuitBreaker {
    fn new(failure_threshold: u32, half_open_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(CircuitBreakerState::new()),
            failure_threshold,
            half_open_timeout,
        }
    }

    async fn call<F, R>(&self, f: F) -> Result<R, ExportError>
    where
        F: std::future::Future<Output = Result<R, ExportError>>,
    {
        let mut cb_state = self.state.lock().await;
        match cb_state.state {
            CircuitState::Open => {
                let cooled_down = cb_state
                    .last_failure_time
                    .is_some_and(|t| t.elapsed() >= self.half_open_timeout);
                if !cooled_down {
                    return Err(ExportError::CircuitOpen(format!(
                        "{} consecutive failures",
                        cb_state.failure_count
                    )));
                }
                cb_state.state = CircuitState::HalfOpen;
                cb_state.half_open_test_in_progress = true;
                info!("Circuit breaker transitioning to half-open state");
            }
            CircuitState::HalfOpen => {
                if cb_state.half_open_test_in_progress {
                    return Err(ExportError::CircuitOpen(
                        "testing recovery (half-open)".to_string(),
                    ));
                }
                cb_state.half_open_test_in_progress = true;
            }
            CircuitState::Closed => {}
        }

        // Not held across the request
        drop(cb_state);

        let result = f.await;

        let mut cb_state = self.state.lock().await;
        match (cb_state.state, &result) {
            (CircuitState::HalfOpen, Ok(_)) => {
                cb_state.state = CircuitState::Closed;
                cb_state.failure_count = 0;
                cb_state.last_failure_time = None;
                cb_state.half_open_test_in_progress = false;
                info!("Circuit breaker recovered - transitioning to closed state");
            }
            (CircuitState::HalfOpen, Err(_)) => {
                cb_state.state = CircuitState::Open;
                cb_state.last_failure_time = Some(Instant::now());
                cb_state.half_open_test_in_progress = false;
                warn!("Circuit breaker test failed - transitioning back to open state");
            }
            (CircuitState::Closed, Ok(_)) => {
                cb_state.failure_count = 0;
                cb_state.last_failure_time = None;
            }
            (CircuitState::Closed, Err(_)) => {
                cb_state.failure_count += 1;
                cb_state.last_failure_time = Some(Instant::now());

                if cb_state.failure_count >= self.failure_threshold {
                    cb_state.state = CircuitState::Open;
                    warn!(
                        failure_count = cb_state.failure_count,
                        threshold = self.failure_threshold,
                        "Circuit breaker opened due to repeated failures"
                    );
                }
            }
            (CircuitState::Open, _) => {}
        }

        result
    }
}

/// OTLP/HTTP forwarder for scraped documents
#[derive(Debug, Clone)]
pub struct OtlpForwarder {
    config: ForwardingConfig,
    circuit_breaker: Arc<CircuitBreaker>,
    client: reqwest::Client,
}

impl OtlpForwarder {
    /// Create a forwarder; `config` must be valid and enabled
    pub fn new(config: ForwardingConfig) -> Result<Self, ReceiverError> {
        config.validate()?;

        if !config.enabled {
            return Err(ExportError::ForwardingError("Forwarding is not enabled".to_string()).into());
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ExportError::ForwardingError(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            endpoint = config.endpoint_url.as_deref().unwrap_or("none"),
            "Created OTLP forwarder"
        );

        Ok(Self {
            config,
            circuit_breaker: Arc::new(CircuitBreaker::new(FAILURE_THRESHOLD, HALF_OPEN_TIMEOUT)),
            client,
        })
    }

    /// POST `document` to `{endpoint}/v1/metrics`
    ///
    /// Empty documents are not sent. Returns once the endpoint has answered
    /// or the circuit breaker has rejected the call.
    pub async fn forward_metrics(&self, document: &MetricsDocument) -> Result<(), ExportError> {
        if document.is_empty() {
            debug!("Nothing to forward");
            return Ok(());
        }

        let body = document.to_protobuf().encode_to_vec();
        self.circuit_breaker
            .call(self.send_protobuf_metrics(body))
            .await?;

        info!(
            resources = document.resource_count(),
            data_points = document.data_point_count(),
            "Successfully forwarded metrics via Protobuf"
        );
        Ok(())
    }

    async fn send_protobuf_metrics(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let url = self.config.endpoint_url.as_deref().ok_or_else(|| {
            ExportError::ForwardingError("Endpoint URL is required".to_string())
        })?;

        let request = self
            .client
            .post(format!("{}/v1/metrics", url.trim_end_matches('/')))
            .header("Content-Type", "application/x-protobuf");
        let request = self.add_auth_headers(request)?;

        let response = request.body(body).send().await.map_err(|e| {
            ExportError::ForwardingError(format!("Failed to send Protobuf metrics: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ExportError::ForwardingError(format!(
                "Remote endpoint returned error: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn add_auth_headers(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ExportError> {
        let Some(auth) = &self.config.authentication else {
            return Ok(request);
        };

        let credential = |key: &str| {
            auth.credentials.get(key).ok_or_else(|| {
                ExportError::ForwardingError(format!(
                    "{} authentication requires '{}' in credentials",
                    auth.auth_type, key
                ))
            })
        };

        match auth.auth_type.as_str() {
            "api_key" => {
                let key = credential("key")?;
                let header_name = auth
                    .credentials
                    .get("header_name")
                    .map(|s| s.expose_secret().clone())
                    .unwrap_or_else(|| "X-API-Key".to_string());
                Ok(request.header(header_name, key.expose_secret()))
            }
            "bearer_token" => Ok(request.bearer_auth(credential("token")?.expose_secret())),
            "basic" => {
                let username = credential("username")?;
                let password = credential("password")?;
                Ok(request.basic_auth(username.expose_secret(), Some(password.expose_secret())))
            }
            other => Err(ExportError::ForwardingError(format!(
                "Unsupported authentication type: {}",
                other
            ))),
        }
    }
}
