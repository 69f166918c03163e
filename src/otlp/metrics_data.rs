//! Metrics document produced by a scrape
//!
//! The document is a strict ownership tree: resources own scopes, scopes own
//! metrics, metrics own their datapoints. Fields are public so callers can walk
//! and assert on it directly; [`MetricsDocument::to_protobuf`] turns it into an
//! OTLP request.

use opentelemetry::{Key, KeyValue, Value};

/// Output of one scrape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsDocument {
    /// One entry per resource, in creation order
    pub resource_metrics: Vec<ResourceNode>,
}

impl MetricsDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no resource was produced
    pub fn is_empty(&self) -> bool {
        self.resource_metrics.is_empty()
    }

    /// Number of resource nodes
    pub fn resource_count(&self) -> usize {
        self.resource_metrics.len()
    }

    /// Iterate over every metric in document order
    pub fn metrics(&self) -> impl Iterator<Item = &MetricNode> {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.scope_metrics.iter())
            .flat_map(|sm| sm.metrics.iter())
    }

    /// Number of metric nodes across all resources
    pub fn metric_count(&self) -> usize {
        self.metrics().count()
    }

    /// Number of datapoints across all metrics
    pub fn data_point_count(&self) -> usize {
        self.metrics().map(|m| m.data_points().len()).sum()
    }
}

/// A monitored resource and the metrics reported for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceNode {
    /// Resource attributes as key-value pairs
    pub attributes: Vec<KeyValue>,
    /// Scope-specific metrics collections
    pub scope_metrics: Vec<ScopeNode>,
}

impl ResourceNode {
    /// Set an attribute, replacing any existing value for the same key
    pub fn put_attribute(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(KeyValue::new(key, value)),
        }
    }

    /// Look up an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }
}

/// Metrics emitted under one instrumentation scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeNode {
    /// Instrumentation scope information
    pub scope: InstrumentationScope,
    /// Metrics collected in this scope
    pub metrics: Vec<MetricNode>,
}

/// Instrumentation scope of a [`ScopeNode`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentationScope {
    /// Name of the instrumentation scope
    pub name: String,
    /// Version of the instrumentation scope
    pub version: Option<String>,
}

impl InstrumentationScope {
    /// Scope stamped on everything this receiver produces
    pub fn receiver() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}

/// A single metric and its datapoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricNode {
    /// Metric name
    pub name: String,
    /// Metric description
    pub description: String,
    /// Metric unit
    pub unit: String,
    /// Metric data; `None` when the kind could not be converted
    pub data: Option<MetricData>,
}

impl MetricNode {
    /// Datapoints regardless of gauge or sum representation
    pub fn data_points(&self) -> &[NumberDataPoint] {
        match &self.data {
            Some(MetricData::Gauge(gauge)) => &gauge.data_points,
            Some(MetricData::Sum(sum)) => &sum.data_points,
            None => &[],
        }
    }
}

/// Metric data (gauge or sum)
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    /// Instantaneous values
    Gauge(Gauge),
    /// Accumulated values
    Sum(Sum),
}

/// Gauge metric data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gauge {
    /// Data points for the gauge metric
    pub data_points: Vec<NumberDataPoint>,
}

/// Sum metric data
#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    /// Data points for the sum metric
    pub data_points: Vec<NumberDataPoint>,
    /// Aggregation temporality (cumulative or delta)
    pub temporality: Temporality,
    /// Whether the sum is monotonic
    pub is_monotonic: bool,
}

/// Aggregation temporality of a [`Sum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporality {
    /// Each point covers the span since the previous point
    Delta,
    /// Each point covers the span since a fixed start
    Cumulative,
}

/// A timestamped numeric sample
#[derive(Debug, Clone, PartialEq)]
pub struct NumberDataPoint {
    /// Attributes associated with this data point
    pub attributes: Vec<KeyValue>,
    /// Start time of the data point in nanoseconds since Unix epoch
    pub start_time_unix_nano: Option<u64>,
    /// Time of the data point in nanoseconds since Unix epoch
    pub time_unix_nano: u64,
    /// Value of the data point (integer or double)
    pub value: NumberValue,
}

/// A number value (integer or double)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    /// Integer value
    AsInt(i64),
    /// Double (floating-point) value
    AsDouble(f64),
}

impl NumberValue {
    /// Value widened to `f64`
    pub fn as_f64(&self) -> f64 {
        match *self {
            NumberValue::AsInt(i) => i as f64,
            NumberValue::AsDouble(d) => d,
        }
    }
}
