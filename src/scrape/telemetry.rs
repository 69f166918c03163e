//! Self-observability instruments
//!
//! Recorded through the global OpenTelemetry meter; without an installed
//! meter provider every call is a no-op.

use opentelemetry::global;
use opentelemetry::metrics::UpDownCounter;

/// Meter name under which the receiver's own instruments are registered
pub const METER_NAME: &str = "gcp-monitoring-receiver";

/// Instruments describing the receiver's own state
#[derive(Clone)]
pub struct ReceiverTelemetry {
    clients_open: UpDownCounter<i64>,
    scrapes_active: UpDownCounter<i64>,
}

impl ReceiverTelemetry {
    /// Register instruments on the global meter
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        Self {
            clients_open: meter
                .i64_up_down_counter("gcp_monitoring_receiver.clients.open")
                .with_description("Number of connected monitoring API clients")
                .with_unit("clients")
                .build(),
            scrapes_active: meter
                .i64_up_down_counter("gcp_monitoring_receiver.scrapes.active")
                .with_description("Number of scrapes in progress")
                .with_unit("scrapes")
                .build(),
        }
    }

    pub(crate) fn client_opened(&self) {
        self.clients_open.add(1, &[]);
    }

    pub(crate) fn client_closed(&self) {
        self.clients_open.add(-1, &[]);
    }

    /// Count a scrape as active until the guard is dropped
    pub(crate) fn scrape_started(&self) -> ActiveScrape {
        self.scrapes_active.add(1, &[]);
        ActiveScrape {
            counter: self.scrapes_active.clone(),
        }
    }
}

impl Default for ReceiverTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiverTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverTelemetry")
            .field("meter", &METER_NAME)
            .finish()
    }
}

/// Guard returned by [`ReceiverTelemetry::scrape_started`]
pub(crate) struct ActiveScrape {
    counter: UpDownCounter<i64>,
}

impl Drop for ActiveScrape {
    fn drop(&mut self) {
        self.counter.add(-1, &[]);
    }
}
