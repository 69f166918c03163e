//! Convert a [`MetricsDocument`] to an OTLP Protobuf request
//!
//! Uses opentelemetry-proto structures directly; one `ResourceMetrics` is
//! emitted per resource node.

use crate::otlp::metrics_data::*;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{
    AnyValue, InstrumentationScope as ProtoInstrumentationScope, KeyValue as ProtoKeyValue,
};
use opentelemetry_proto::tonic::metrics::v1::{
    AggregationTemporality, Gauge as ProtoGauge, Metric, NumberDataPoint as ProtoNumberDataPoint,
    ResourceMetrics as ProtoResourceMetrics, ScopeMetrics as ProtoScopeMetrics, Sum as ProtoSum,
    metric::Data,
};
use opentelemetry_proto::tonic::resource::v1::Resource as ProtoResource;

impl MetricsDocument {
    /// Convert to Protobuf ExportMetricsServiceRequest
    pub fn to_protobuf(&self) -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: self.resource_metrics.iter().map(resource_to_proto).collect(),
        }
    }
}

fn resource_to_proto(resource: &ResourceNode) -> ProtoResourceMetrics {
    ProtoResourceMetrics {
        resource: Some(ProtoResource {
            attributes: resource.attributes.iter().map(key_value_to_proto).collect(),
            dropped_attributes_count: 0,
            entity_refs: vec![],
        }),
        scope_metrics: resource
            .scope_metrics
            .iter()
            .map(|sm| ProtoScopeMetrics {
                scope: Some(ProtoInstrumentationScope {
                    name: sm.scope.name.clone(),
                    version: sm.scope.version.clone().unwrap_or_default(),
                    attributes: vec![],
                    dropped_attributes_count: 0,
                }),
                metrics: sm.metrics.iter().map(metric_to_proto).collect(),
                schema_url: String::new(),
            })
            .collect(),
        schema_url: String::new(),
    }
}

fn key_value_to_proto(kv: &opentelemetry::KeyValue) -> ProtoKeyValue {
    use opentelemetry_proto::tonic::common::v1::any_value::Value;

    let value = match &kv.value {
        opentelemetry::Value::String(s) => Some(Value::StringValue(s.to_string())),
        opentelemetry::Value::I64(i) => Some(Value::IntValue(*i)),
        opentelemetry::Value::F64(f) => Some(Value::DoubleValue(*f)),
        opentelemetry::Value::Bool(b) => Some(Value::BoolValue(*b)),
        // Arrays never appear in scraped attributes
        _ => None,
    };

    ProtoKeyValue {
        key: kv.key.as_str().to_string(),
        value: value.map(|value| AnyValue { value: Some(value) }),
    }
}

fn metric_to_proto(metric: &MetricNode) -> Metric {
    let data = metric.data.as_ref().map(|data| match data {
        MetricData::Gauge(gauge) => Data::Gauge(ProtoGauge {
            data_points: gauge.data_points.iter().map(data_point_to_proto).collect(),
        }),
        MetricData::Sum(sum) => Data::Sum(ProtoSum {
            data_points: sum.data_points.iter().map(data_point_to_proto).collect(),
            aggregation_temporality: temporality_to_proto(sum.temporality) as i32,
            is_monotonic: sum.is_monotonic,
        }),
    });

    Metric {
        name: metric.name.clone(),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        metadata: vec![],
        data,
    }
}

fn temporality_to_proto(temporality: Temporality) -> AggregationTemporality {
    match temporality {
        Temporality::Delta => AggregationTemporality::Delta,
        Temporality::Cumulative => AggregationTemporality::Cumulative,
    }
}

fn data_point_to_proto(dp: &NumberDataPoint) -> ProtoNumberDataPoint {
    use opentelemetry_proto::tonic::metrics::v1::number_data_point::Value;

    let value = match dp.value {
        NumberValue::AsInt(i) => Value::AsInt(i),
        NumberValue::AsDouble(d) => Value::AsDouble(d),
    };

    ProtoNumberDataPoint {
        attributes: dp.attributes.iter().map(key_value_to_proto).collect(),
        start_time_unix_nano: dp.start_time_unix_nano.unwrap_or(0),
        time_unix_nano: dp.time_unix_nano,
        value: Some(value),
        exemplars: vec![],
        flags: 0,
    }
}
