//! Scrape pipeline
//!
//! Window and filter computation, descriptor caching, time-series retrieval,
//! and conversion of raw series into a [`crate::otlp::MetricsDocument`].

pub mod descriptors;
pub mod fetcher;
pub mod filter;
pub mod grouping;
pub mod kind;
pub mod receiver;
pub mod telemetry;
pub mod window;

pub use descriptors::DescriptorCache;
pub use fetcher::fetch_time_series;
pub use filter::filter_query;
pub use grouping::{MetricTreeBuilder, RESOURCE_TYPE_ATTRIBUTE, ResourceKey};
pub use kind::convert;
pub use receiver::MonitoringReceiver;
pub use telemetry::ReceiverTelemetry;
pub use window::{Clock, FixedClock, SystemClock, TimeWindow, calculate_window};
