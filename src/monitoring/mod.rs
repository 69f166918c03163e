//! Google Cloud Monitoring API access
//!
//! Wire types, the [`MonitoringApi`] seam used by the scraper, its HTTP
//! implementation, credential resolution and page iteration.

pub mod client;
pub mod credentials;
pub mod pagination;
pub mod types;

pub use client::{ApiConnector, HttpConnector, MonitoringApi, MonitoringClient};
pub use credentials::TokenSource;
pub use pagination::{next_or_cancelled, paginate};
pub use types::{
    Metric, MetricDescriptor, MetricKind, MonitoredResource, MonitoredResourceMetadata, Page,
    Point, TimeInterval, TimeSeries, TypedValue,
};
