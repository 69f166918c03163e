//! Conversion of raw points into datapoints, by metric kind

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tracing::{debug, info};

use crate::monitoring::{MetricKind, Point, TimeSeries, TypedValue};
use crate::otlp::metrics_data::{
    Gauge, MetricData, MetricNode, NumberDataPoint, NumberValue, Sum, Temporality,
};

/// Fill `metric` with the points of `series`, interpreted as `kind`
///
/// Unsupported kinds leave the metric without data. Only numeric points are
/// converted; values and timestamps are copied verbatim.
pub fn convert(kind: &MetricKind, series: &TimeSeries, metric: &mut MetricNode) {
    match kind {
        MetricKind::Gauge => convert_gauge(series, metric),
        MetricKind::Cumulative => convert_sum(series, metric, Temporality::Cumulative, true),
        MetricKind::Delta => convert_sum(series, metric, Temporality::Delta, false),
        MetricKind::Unsupported(kind) => {
            info!(
                metric_type = %series.metric.metric_type,
                metric_kind = %kind,
                "Unsupported metric kind"
            );
        }
    }
}

fn convert_gauge(series: &TimeSeries, metric: &mut MetricNode) {
    let data_points = series
        .points
        .iter()
        .filter_map(|point| number_point(series, point, false))
        .collect();
    metric.data = Some(MetricData::Gauge(Gauge { data_points }));
}

fn convert_sum(
    series: &TimeSeries,
    metric: &mut MetricNode,
    temporality: Temporality,
    is_monotonic: bool,
) {
    let data_points = series
        .points
        .iter()
        .filter_map(|point| number_point(series, point, true))
        .collect();
    metric.data = Some(MetricData::Sum(Sum {
        data_points,
        temporality,
        is_monotonic,
    }));
}

fn number_point(series: &TimeSeries, point: &Point, with_start: bool) -> Option<NumberDataPoint> {
    let value = match &point.value {
        TypedValue::Double(value) => NumberValue::AsDouble(*value),
        TypedValue::Int64(value) => NumberValue::AsInt(*value),
        other => {
            debug!(
                metric_type = %series.metric.metric_type,
                value_type = other.type_name(),
                "Skipping point with unsupported value type"
            );
            return None;
        }
    };

    let start_time_unix_nano = if with_start {
        point.interval.start_time.map(unix_nanos)
    } else {
        None
    };

    Some(NumberDataPoint {
        attributes: series
            .metric
            .labels
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect(),
        start_time_unix_nano,
        time_unix_nano: unix_nanos(point.interval.end_time),
        value,
    })
}

fn unix_nanos(time: DateTime<Utc>) -> u64 {
    time.timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::TimeInterval;
    use chrono::{TimeDelta, TimeZone};

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn point(start: Option<u32>, end: u32, value: TypedValue) -> Point {
        Point {
            interval: TimeInterval {
                start_time: start.map(t),
                end_time: t(end),
            },
            value,
        }
    }

    fn series(points: Vec<Point>) -> TimeSeries {
        let mut series = TimeSeries::default();
        series.metric.metric_type = "compute.googleapis.com/instance/cpu/usage_time".to_string();
        series
            .metric
            .labels
            .insert("instance_name".to_string(), "vm-1".to_string());
        series.points = points;
        series
    }

    #[test]
    fn test_gauge_has_no_start_timestamps() {
        let ts = series(vec![
            point(Some(0), 1, TypedValue::Double(0.5)),
            point(None, 2, TypedValue::Double(0.75)),
            point(None, 3, TypedValue::Int64(3)),
        ]);
        let mut metric = MetricNode::default();

        convert(&MetricKind::Gauge, &ts, &mut metric);

        let Some(MetricData::Gauge(gauge)) = &metric.data else {
            panic!("Expected gauge data, got {:?}", metric.data);
        };
        assert_eq!(gauge.data_points.len(), 3);
        assert!(gauge.data_points.iter().all(|dp| dp.start_time_unix_nano.is_none()));
        assert_eq!(gauge.data_points[0].value, NumberValue::AsDouble(0.5));
        assert_eq!(gauge.data_points[2].value, NumberValue::AsInt(3));
        assert_eq!(
            gauge.data_points[1].time_unix_nano,
            t(2).timestamp_nanos_opt().unwrap() as u64
        );
        assert_eq!(
            gauge.data_points[0].attributes,
            vec![KeyValue::new("instance_name", "vm-1")]
        );
    }

    #[test]
    fn test_cumulative_is_monotonic_with_start() {
        let ts = series(vec![
            point(Some(0), 1, TypedValue::Int64(10)),
            point(Some(0), 2, TypedValue::Int64(25)),
        ]);
        let mut metric = MetricNode::default();

        convert(&MetricKind::Cumulative, &ts, &mut metric);

        let Some(MetricData::Sum(sum)) = &metric.data else {
            panic!("Expected sum data, got {:?}", metric.data);
        };
        assert_eq!(sum.temporality, Temporality::Cumulative);
        assert!(sum.is_monotonic);
        assert_eq!(sum.data_points.len(), 2);
        for dp in &sum.data_points {
            assert_eq!(
                dp.start_time_unix_nano,
                Some(t(0).timestamp_nanos_opt().unwrap() as u64)
            );
        }
    }

    #[test]
    fn test_delta_is_not_monotonic() {
        let ts = series(vec![point(Some(1), 2, TypedValue::Double(-1.5))]);
        let mut metric = MetricNode::default();

        convert(&MetricKind::Delta, &ts, &mut metric);

        let Some(MetricData::Sum(sum)) = &metric.data else {
            panic!("Expected sum data, got {:?}", metric.data);
        };
        assert_eq!(sum.temporality, Temporality::Delta);
        assert!(!sum.is_monotonic);
        assert_eq!(sum.data_points[0].value, NumberValue::AsDouble(-1.5));
        let span = sum.data_points[0].time_unix_nano - sum.data_points[0].start_time_unix_nano.unwrap();
        assert_eq!(span as i64, TimeDelta::minutes(1).num_nanoseconds().unwrap());
    }

    #[test]
    fn test_unsupported_kind_produces_no_data() {
        let ts = series(vec![point(Some(0), 1, TypedValue::Double(1.0))]);
        let mut metric = MetricNode::default();

        convert(&MetricKind::Unsupported("HISTOGRAM".to_string()), &ts, &mut metric);

        assert!(metric.data.is_none());
        assert!(metric.data_points().is_empty());
    }

    #[test]
    fn test_non_numeric_points_are_skipped() {
        let ts = series(vec![
            point(None, 1, TypedValue::Bool(true)),
            point(None, 2, TypedValue::String("up".to_string())),
            point(None, 3, TypedValue::Double(2.0)),
        ]);
        let mut metric = MetricNode::default();

        convert(&MetricKind::Gauge, &ts, &mut metric);

        assert_eq!(metric.data_points().len(), 1);
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let ts = series(vec![
            point(Some(0), 1, TypedValue::Int64(7)),
            point(Some(0), 2, TypedValue::Int64(9)),
        ]);
        let mut first = MetricNode::default();
        let mut second = MetricNode::default();

        convert(&MetricKind::Cumulative, &ts, &mut first);
        convert(&MetricKind::Cumulative, &ts, &mut second);

        assert_eq!(first, second);
    }
}
