//! Standalone GCP Monitoring receiver
//!
//! Scrapes the configured metric types on every collection interval and
//! forwards the result to an OTLP/HTTP endpoint, or logs a summary when
//! forwarding is disabled.
//!
//! Configuration comes from the YAML file named by `GCM_CONFIG`, otherwise
//! from `GCM_*` environment variables.

use anyhow::Context;
use gcp_monitoring_receiver::{
    ConfigLoader, MetricsDocument, MonitoringReceiver, OtlpForwarder, PartialScrape,
};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = match std::env::var("GCM_CONFIG") {
        Ok(path) => ConfigLoader::from_yaml(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        Err(_) => ConfigLoader::from_env().context("loading configuration from environment")?,
    };

    let forwarder = match &config.forwarding {
        Some(forwarding) if forwarding.enabled => Some(OtlpForwarder::new(forwarding.clone())?),
        _ => None,
    };

    let collection_interval = config.collection_interval();
    let initial_delay = Duration::from_secs(config.initial_delay_secs);

    let receiver = MonitoringReceiver::new(config);
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
        }
        signal_cancel.cancel();
    });

    receiver
        .start(&cancel)
        .await
        .context("starting monitoring receiver")?;

    info!(
        interval_secs = collection_interval.as_secs(),
        initial_delay_secs = initial_delay.as_secs(),
        "GCP Monitoring receiver started"
    );

    let mut ticker = interval_at(tokio::time::Instant::now() + initial_delay, collection_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match receiver.scrape(&cancel).await {
            Ok(document) => deliver(forwarder.as_ref(), &document).await,
            Err(PartialScrape { metrics, source }) => {
                error!(error = %source, "Scrape failed");
                if !metrics.is_empty() {
                    deliver(forwarder.as_ref(), &metrics).await;
                }
            }
        }
    }

    receiver.shutdown().await;
    Ok(())
}

async fn deliver(forwarder: Option<&OtlpForwarder>, document: &MetricsDocument) {
    match forwarder {
        Some(forwarder) => {
            if let Err(e) = forwarder.forward_metrics(document).await {
                warn!(error = %e, "Failed to forward metrics");
            }
        }
        None => info!(
            resources = document.resource_count(),
            metrics = document.metric_count(),
            data_points = document.data_point_count(),
            "Scrape complete"
        ),
    }
}
