//! Cloud Monitoring v3 resources as they appear on the wire (JSON)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in remote order
    pub items: Vec<T>,
    /// Token for the next page; `None` or empty ends the sequence
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// A page that ends the sequence
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// A page followed by another one
    pub fn with_next(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: Some(token.into()),
        }
    }
}

/// How successive values of a metric relate to each other
///
/// Kinds other than gauge, cumulative and delta are kept verbatim in
/// [`MetricKind::Unsupported`] so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum MetricKind {
    /// Instantaneous value
    Gauge,
    /// Monotonically accumulating total
    Cumulative,
    /// Change since the previous point
    Delta,
    /// Any other kind, including `METRIC_KIND_UNSPECIFIED`
    Unsupported(String),
}

impl Default for MetricKind {
    fn default() -> Self {
        MetricKind::Unsupported("METRIC_KIND_UNSPECIFIED".to_string())
    }
}

impl From<String> for MetricKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "GAUGE" => MetricKind::Gauge,
            "CUMULATIVE" => MetricKind::Cumulative,
            "DELTA" => MetricKind::Delta,
            _ => MetricKind::Unsupported(kind),
        }
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("GAUGE"),
            MetricKind::Cumulative => f.write_str("CUMULATIVE"),
            MetricKind::Delta => f.write_str("DELTA"),
            MetricKind::Unsupported(kind) => f.write_str(kind),
        }
    }
}

/// Metadata describing a metric type
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    /// Resource name, `projects/{project}/metricDescriptors/{type}`
    #[serde(default)]
    pub name: String,
    /// Metric type, the cache key
    #[serde(rename = "type", default)]
    pub metric_type: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
    /// Free-text description, copied onto the metric node
    #[serde(default)]
    pub description: String,
    /// UCUM unit string
    #[serde(default)]
    pub unit: String,
    /// Selects the conversion applied to every series of this type
    #[serde(default)]
    pub metric_kind: MetricKind,
    /// `DOUBLE`, `INT64`, `BOOL`, `STRING` or `DISTRIBUTION`
    #[serde(default)]
    pub value_type: String,
}

/// Metric type and labels of a time series
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Metric {
    /// Metric type, e.g. `compute.googleapis.com/instance/cpu/usage_time`
    #[serde(rename = "type", default)]
    pub metric_type: String,
    /// Metric labels; these become data point attributes
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// The monitored entity a time series describes
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitoredResource {
    /// Resource type, e.g. `gce_instance`
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Resource labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Auxiliary labels attached to a monitored resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredResourceMetadata {
    /// System-defined labels; values can be any JSON value
    #[serde(default)]
    pub system_labels: BTreeMap<String, serde_json::Value>,
    /// User-defined labels
    #[serde(default)]
    pub user_labels: BTreeMap<String, String>,
}

/// A raw time series returned by `projects.timeSeries.list`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// Metric type and labels
    #[serde(default)]
    pub metric: Metric,
    /// Monitored resource
    #[serde(default)]
    pub resource: MonitoredResource,
    /// Present only with the FULL view
    #[serde(default)]
    pub metadata: Option<MonitoredResourceMetadata>,
    /// Kind reported by the series; conversion uses the descriptor's kind instead
    #[serde(default)]
    pub metric_kind: MetricKind,
    /// Value type reported by the series
    #[serde(default)]
    pub value_type: String,
    /// Points in remote order (newest first for the v3 API)
    #[serde(default)]
    pub points: Vec<Point>,
    /// Unit reported by the series
    #[serde(default)]
    pub unit: String,
}

/// A single sample
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Point {
    /// Time span of the sample
    pub interval: TimeInterval,
    /// Sampled value
    pub value: TypedValue,
}

/// Time span covered by a [`Point`]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    /// Absent for gauge points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Sample time
    pub end_time: DateTime<Utc>,
}

/// Value of a [`Point`]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum TypedValue {
    /// Floating point value
    #[serde(rename = "doubleValue")]
    Double(f64),
    /// Encoded as a decimal string in JSON
    #[serde(rename = "int64Value", with = "int64_string")]
    Int64(i64),
    /// Not converted
    #[serde(rename = "boolValue")]
    Bool(bool),
    /// Not converted
    #[serde(rename = "stringValue")]
    String(String),
    /// Kept as raw JSON; not converted
    #[serde(rename = "distributionValue")]
    Distribution(serde_json::Value),
}

impl TypedValue {
    /// Wire name of the value type, for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Double(_) => "DOUBLE",
            TypedValue::Int64(_) => "INT64",
            TypedValue::Bool(_) => "BOOL",
            TypedValue::String(_) => "STRING",
            TypedValue::Distribution(_) => "DISTRIBUTION",
        }
    }
}

mod int64_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(i64),
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(D::Error::custom),
            Repr::Number(number) => Ok(number),
        }
    }
}

/// Body of a `metricDescriptors.list` response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListMetricDescriptorsResponse {
    #[serde(default)]
    pub metric_descriptors: Vec<MetricDescriptor>,
    #[serde(default)]
    pub next_page_token: String,
}

/// Body of a `timeSeries.list` response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListTimeSeriesResponse {
    #[serde(default)]
    pub time_series: Vec<TimeSeries>,
    #[serde(default)]
    pub next_page_token: String,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Convert an empty token into end-of-sequence
pub(crate) fn next_token(token: String) -> Option<String> {
    if token.is_empty() { None } else { Some(token) }
}
