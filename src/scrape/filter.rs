//! Remote filter expressions

use crate::config::MetricConfig;

/// Filter matching exactly the configured metric type
pub fn filter_query(metric: &MetricConfig) -> String {
    format!(r#"metric.type = "{}""#, metric.metric_name)
}
