//! Remote monitoring API seam and its HTTP/JSON implementation

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, StartupError};
use crate::monitoring::credentials::TokenSource;
use crate::monitoring::types::{
    ErrorEnvelope, ListMetricDescriptorsResponse, ListTimeSeriesResponse, MetricDescriptor, Page,
    TimeSeries, next_token,
};
use crate::scrape::window::TimeWindow;

/// The two read-only listings the receiver needs
///
/// Each call returns one page. Iterating the full sequence is done by
/// [`crate::monitoring::paginate`].
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// List metric descriptors matching `filter`
    async fn list_metric_descriptors(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<Page<MetricDescriptor>, ApiError>;

    /// List time series matching `filter` within `window`, full view
    async fn list_time_series(
        &self,
        project_id: &str,
        filter: &str,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<Page<TimeSeries>, ApiError>;
}

/// Builds the API handle when the receiver starts
#[async_trait]
pub trait ApiConnector: Send + Sync {
    /// Resolve credentials and construct a client
    async fn connect(&self, config: &Config) -> Result<Arc<dyn MonitoringApi>, StartupError>;
}

/// Connector for the real Cloud Monitoring endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

#[async_trait]
impl ApiConnector for HttpConnector {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn MonitoringApi>, StartupError> {
        let tokens = TokenSource::resolve(&config.credentials).await?;
        let client = MonitoringClient::new(
            &config.endpoint,
            tokens,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Arc::new(client))
    }
}

/// A pre-built API handle is its own connector
#[async_trait]
impl<T> ApiConnector for Arc<T>
where
    T: MonitoringApi + 'static,
{
    async fn connect(&self, _config: &Config) -> Result<Arc<dyn MonitoringApi>, StartupError> {
        Ok(self.clone())
    }
}

/// HTTP/JSON client for `monitoring.googleapis.com/v3`
#[derive(Debug, Clone)]
pub struct MonitoringClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenSource,
}

impl MonitoringClient {
    /// Create a client for `endpoint`, asking `tokens` for a bearer token per request
    pub fn new(
        endpoint: &str,
        tokens: impl Into<TokenSource>,
        timeout: Duration,
    ) -> Result<Self, StartupError> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| StartupError::ClientConstruction(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                StartupError::ClientConstruction(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url,
            tokens: tokens.into(),
        })
    }

    fn project_url(&self, project_id: &str, collection: &str) -> String {
        format!(
            "{}/v3/projects/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            project_id,
            collection
        )
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<R, ApiError> {
        debug!(url = %url, "Sending monitoring API request");

        let token = self.tokens.token().await?;
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &body);
            warn!(url = %url, status = status.as_u16(), error = %message, "Monitoring API returned an error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => status.to_string(),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl MonitoringApi for MonitoringClient {
    async fn list_metric_descriptors(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<Page<MetricDescriptor>, ApiError> {
        let mut query = vec![("filter", filter.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: ListMetricDescriptorsResponse = self
            .get_json(&self.project_url(project_id, "metricDescriptors"), &query)
            .await?;

        Ok(Page {
            items: response.metric_descriptors,
            next_page_token: next_token(response.next_page_token),
        })
    }

    async fn list_time_series(
        &self,
        project_id: &str,
        filter: &str,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<Page<TimeSeries>, ApiError> {
        let mut query = vec![
            ("filter", filter.to_string()),
            ("interval.startTime", window.start_param()),
            ("interval.endTime", window.end_param()),
            ("view", "FULL".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: ListTimeSeriesResponse = self
            .get_json(&self.project_url(project_id, "timeSeries"), &query)
            .await?;

        Ok(Page {
            items: response.time_series,
            next_page_token: next_token(response.next_page_token),
        })
    }
}
