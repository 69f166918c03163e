//! OpenTelemetry Protocol (OTLP) module
//!
//! The metrics document produced by a scrape, its protobuf encoding, and
//! forwarding to a remote OTLP/HTTP endpoint.

pub mod forwarder;
pub mod metrics_converter;
pub mod metrics_data;

pub use forwarder::OtlpForwarder;
pub use metrics_data::{
    Gauge, InstrumentationScope, MetricData, MetricNode, MetricsDocument, NumberDataPoint,
    NumberValue, ResourceNode, ScopeNode, Sum, Temporality,
};
