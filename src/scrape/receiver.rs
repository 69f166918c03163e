//! Receiver lifecycle and the scrape loop body

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ApiError, PartialScrape, ScrapeError, StartupError};
use crate::monitoring::{ApiConnector, HttpConnector, MonitoringApi, next_or_cancelled};
use crate::otlp::metrics_data::MetricsDocument;
use crate::scrape::descriptors::DescriptorCache;
use crate::scrape::fetcher::fetch_time_series;
use crate::scrape::filter::filter_query;
use crate::scrape::grouping::MetricTreeBuilder;
use crate::scrape::kind::convert;
use crate::scrape::telemetry::ReceiverTelemetry;
use crate::scrape::window::{Clock, SystemClock, calculate_window};

/// Connected API handle and the descriptors fetched with it
#[derive(Clone)]
struct ClientState {
    api: Arc<dyn MonitoringApi>,
    descriptors: Arc<DescriptorCache>,
}

/// Pulls configured metrics from Cloud Monitoring into [`MetricsDocument`]s
///
/// The API client is created by [`start`](Self::start) and dropped by
/// [`shutdown`](Self::shutdown). Scrapes are expected to run one at a time;
/// concurrent calls are safe but each builds its own document.
///
/// # Example
///
/// ```no_run
/// use gcp_monitoring_receiver::{ConfigLoader, MonitoringReceiver};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), gcp_monitoring_receiver::ReceiverError> {
/// let config = ConfigLoader::from_env()?;
/// let receiver = MonitoringReceiver::new(config);
/// let cancel = CancellationToken::new();
///
/// receiver.start(&cancel).await?;
/// match receiver.scrape(&cancel).await {
///     Ok(document) => println!("{} metrics", document.metric_count()),
///     Err(partial) => eprintln!("{}", partial),
/// }
/// receiver.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct MonitoringReceiver {
    config: Config,
    connector: Box<dyn ApiConnector>,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<ClientState>>,
    telemetry: ReceiverTelemetry,
}

impl MonitoringReceiver {
    /// Receiver talking to the endpoint named in `config`
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, HttpConnector)
    }

    /// Receiver obtaining its API handle from `connector`
    pub fn with_connector(config: Config, connector: impl ApiConnector + 'static) -> Self {
        Self {
            config,
            connector: Box::new(connector),
            clock: Arc::new(SystemClock),
            state: Mutex::new(None),
            telemetry: ReceiverTelemetry::new(),
        }
    }

    /// Replace the clock used to compute query windows
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Configuration the receiver was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether `start` has succeeded and `shutdown` has not been called since
    pub async fn is_started(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Connect and populate the descriptor cache
    ///
    /// Does nothing when already started. On failure the receiver stays
    /// stopped and `start` may be called again.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<(), StartupError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            debug!("Monitoring receiver already started");
            return Ok(());
        }

        let api = self.connector.connect(&self.config).await?;
        self.telemetry.client_opened();

        let descriptors = match DescriptorCache::populate(
            api.as_ref(),
            &self.config.project_id,
            &self.config.metrics_list,
            cancel,
        )
        .await
        {
            Ok(descriptors) => descriptors,
            Err(e) => {
                self.telemetry.client_closed();
                return Err(StartupError::Descriptors(e));
            }
        };

        info!(
            project_id = %self.config.project_id,
            metrics = self.config.metrics_list.len(),
            descriptors = descriptors.len(),
            "Monitoring receiver started"
        );
        *state = Some(ClientState {
            api,
            descriptors: Arc::new(descriptors),
        });
        Ok(())
    }

    /// Fetch and convert every configured metric once
    ///
    /// Metrics are processed in configuration order. The first fetch error
    /// or a cancellation ends the scrape; metrics converted up to that point
    /// are returned inside the [`PartialScrape`].
    pub async fn scrape(&self, cancel: &CancellationToken) -> Result<MetricsDocument, PartialScrape> {
        let _active = self.telemetry.scrape_started();

        let Some(state) = self.state.lock().await.clone() else {
            return Err(PartialScrape {
                metrics: MetricsDocument::new(),
                source: ScrapeError::NotStarted,
            });
        };

        let mut builder = MetricTreeBuilder::new(self.config.resource_grouping);

        for metric in &self.config.metrics_list {
            if cancel.is_cancelled() {
                return Err(abort(builder, ScrapeError::Cancelled));
            }

            let Some(descriptor) = state.descriptors.lookup(&metric.metric_name) else {
                warn!(metric_type = %metric.metric_name, "Metric descriptor not found");
                continue;
            };

            let window = calculate_window(
                self.clock.now(),
                self.config.collection_interval(),
                metric.fetch_delay(),
            );
            debug!(
                metric_type = %metric.metric_name,
                start = %window.start_param(),
                end = %window.end_param(),
                "Listing time series"
            );

            let series = fetch_time_series(
                state.api.clone(),
                &self.config.project_id,
                filter_query(metric),
                window,
            );
            let mut series = std::pin::pin!(series);

            loop {
                match next_or_cancelled(&mut series, cancel).await {
                    Ok(Some(ts)) => {
                        let node = builder.place(descriptor, &ts);
                        convert(&descriptor.metric_kind, &ts, node);
                    }
                    Ok(None) => break,
                    Err(ApiError::Cancelled) => {
                        return Err(abort(builder, ScrapeError::Cancelled));
                    }
                    Err(source) => {
                        warn!(
                            metric_type = %metric.metric_name,
                            error = %source,
                            "Failed to retrieve time series data"
                        );
                        return Err(abort(
                            builder,
                            ScrapeError::TimeSeries {
                                metric_type: metric.metric_name.clone(),
                                source,
                            },
                        ));
                    }
                }
            }
        }

        let document = builder.finish();
        debug!(
            resources = document.resource_count(),
            data_points = document.data_point_count(),
            "Scrape finished"
        );
        Ok(document)
    }

    /// Rebuild the descriptor cache and swap it in
    ///
    /// The current cache stays in place when the rebuild fails. Returns the
    /// number of cached descriptors.
    pub async fn repopulate_descriptors(&self, cancel: &CancellationToken) -> Result<usize, ScrapeError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.as_mut() else {
            return Err(ScrapeError::NotStarted);
        };

        let descriptors = DescriptorCache::populate(
            current.api.as_ref(),
            &self.config.project_id,
            &self.config.metrics_list,
            cancel,
        )
        .await
        .map_err(ScrapeError::Descriptors)?;

        let count = descriptors.len();
        current.descriptors = Arc::new(descriptors);
        info!(descriptors = count, "Metric descriptors refreshed");
        Ok(count)
    }

    /// Drop the API client; a later `start` reconnects
    pub async fn shutdown(&self) {
        if self.state.lock().await.take().is_some() {
            self.telemetry.client_closed();
            info!("Monitoring receiver stopped");
        }
    }
}

impl std::fmt::Debug for MonitoringReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringReceiver")
            .field("project_id", &self.config.project_id)
            .field("metrics", &self.config.metrics_list.len())
            .finish_non_exhaustive()
    }
}

fn abort(builder: MetricTreeBuilder, source: ScrapeError) -> PartialScrape {
    PartialScrape {
        metrics: builder.finish(),
        source,
    }
}
