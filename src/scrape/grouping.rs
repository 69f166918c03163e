//! Placement of raw time series in the metrics document
//!
//! Each series maps to a resource node identified by its resource type,
//! resource labels and metric labels. Whether two series with the same
//! identity share a node depends on [`ResourceGrouping`].

use std::collections::{BTreeMap, HashMap};

use crate::config::ResourceGrouping;
use crate::monitoring::{MetricDescriptor, TimeSeries};
use crate::otlp::metrics_data::{
    InstrumentationScope, MetricNode, MetricsDocument, ResourceNode, ScopeNode,
};

/// Resource attribute holding the monitored resource type
pub const RESOURCE_TYPE_ATTRIBUTE: &str = "gcp.resource_type";

/// Identity of a resource node
///
/// Label maps are kept structured and ordered, so `{"a": "bc"}` and
/// `{"ab": "c"}` stay distinct and label order never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    resource_type: String,
    resource_labels: BTreeMap<String, String>,
    metric_labels: BTreeMap<String, String>,
}

impl ResourceKey {
    /// Identity of the resource a series belongs to
    pub fn from_series(series: &TimeSeries) -> Self {
        Self {
            resource_type: series.resource.resource_type.clone(),
            resource_labels: series.resource.labels.clone(),
            metric_labels: series.metric.labels.clone(),
        }
    }
}

/// Builds one scrape's [`MetricsDocument`]
#[derive(Debug)]
pub struct MetricTreeBuilder {
    grouping: ResourceGrouping,
    document: MetricsDocument,
    index: HashMap<ResourceKey, usize>,
}

impl MetricTreeBuilder {
    /// Start an empty document
    pub fn new(grouping: ResourceGrouping) -> Self {
        Self {
            grouping,
            document: MetricsDocument::default(),
            index: HashMap::new(),
        }
    }

    /// Append a metric node for `series` and return it for conversion
    ///
    /// The node is named and described from `descriptor`. Under
    /// [`ResourceGrouping::PerSeries`] every call creates a fresh resource node.
    pub fn place(&mut self, descriptor: &MetricDescriptor, series: &TimeSeries) -> &mut MetricNode {
        let position = match self.grouping {
            ResourceGrouping::PerSeries => self.push_resource(series),
            ResourceGrouping::Merged => {
                let key = ResourceKey::from_series(series);
                match self.index.get(&key) {
                    Some(&position) => position,
                    None => {
                        let position = self.push_resource(series);
                        self.index.insert(key, position);
                        position
                    }
                }
            }
        };

        let resource = &mut self.document.resource_metrics[position];
        if resource.scope_metrics.is_empty() {
            resource.scope_metrics.push(ScopeNode {
                scope: InstrumentationScope::receiver(),
                metrics: Vec::new(),
            });
        }

        let metrics = &mut resource.scope_metrics[0].metrics;
        metrics.push(MetricNode {
            name: descriptor.metric_type.clone(),
            description: descriptor.description.clone(),
            unit: descriptor.unit.clone(),
            data: None,
        });
        let last = metrics.len() - 1;
        &mut metrics[last]
    }

    /// Finished document
    pub fn finish(self) -> MetricsDocument {
        self.document
    }

    fn push_resource(&mut self, series: &TimeSeries) -> usize {
        self.document.resource_metrics.push(resource_for(series));
        self.document.resource_metrics.len() - 1
    }
}

/// Resource node with type, labels, then metadata labels overlaid in that order
///
/// String system labels are copied verbatim. Any other system label value
/// (bool, number, list, struct) is rendered as compact JSON text, e.g.
/// `true`, `3`, `["a","b"]` or `{"a":1}`. Consumers matching on these
/// attributes see JSON quoting and brackets, not a bare value listing.
fn resource_for(series: &TimeSeries) -> ResourceNode {
    let mut resource = ResourceNode::default();
    resource.put_attribute(RESOURCE_TYPE_ATTRIBUTE, series.resource.resource_type.clone());
    for (key, value) in &series.resource.labels {
        resource.put_attribute(key.clone(), value.clone());
    }

    if let Some(metadata) = &series.metadata {
        for (key, value) in &metadata.user_labels {
            resource.put_attribute(key.clone(), value.clone());
        }
        for (key, value) in &metadata.system_labels {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            resource.put_attribute(key.clone(), value);
        }
    }

    resource
}
