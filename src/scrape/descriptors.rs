//! Metric descriptor cache
//!
//! Built once when the receiver starts and read-only afterwards. A rebuild
//! produces a new cache that replaces the old one wholesale; entries never
//! expire on their own.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::MetricConfig;
use crate::error::ApiError;
use crate::monitoring::{MetricDescriptor, MonitoringApi, next_or_cancelled, paginate};
use crate::scrape::filter::filter_query;

/// Descriptors keyed by metric type
#[derive(Debug, Clone, Default)]
pub struct DescriptorCache {
    descriptors: HashMap<String, MetricDescriptor>,
}

impl DescriptorCache {
    /// List the descriptors of every configured metric
    ///
    /// Duplicate types overwrite earlier entries. The first listing error
    /// aborts the whole population and nothing collected so far is kept.
    pub async fn populate(
        api: &dyn MonitoringApi,
        project_id: &str,
        metrics: &[MetricConfig],
        cancel: &CancellationToken,
    ) -> Result<Self, ApiError> {
        let mut cache = Self::default();

        for metric in metrics {
            let filter = filter_query(metric);
            let filter = filter.as_str();
            let descriptors = paginate(move |page_token: Option<String>| async move {
                api.list_metric_descriptors(project_id, filter, page_token.as_deref())
                    .await
            });
            let mut descriptors = std::pin::pin!(descriptors);

            while let Some(descriptor) = next_or_cancelled(&mut descriptors, cancel).await? {
                debug!(
                    metric_type = %descriptor.metric_type,
                    metric_kind = %descriptor.metric_kind,
                    "Cached metric descriptor"
                );
                cache.insert(descriptor);
            }
        }

        Ok(cache)
    }

    /// Store a descriptor under its type
    pub fn insert(&mut self, descriptor: MetricDescriptor) {
        self.descriptors
            .insert(descriptor.metric_type.clone(), descriptor);
    }

    /// Cached descriptor for `metric_type`; never triggers a fetch
    pub fn lookup(&self, metric_type: &str) -> Option<&MetricDescriptor> {
        self.descriptors.get(metric_type)
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the cache holds no descriptor
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl FromIterator<MetricDescriptor> for DescriptorCache {
    fn from_iter<I: IntoIterator<Item = MetricDescriptor>>(iter: I) -> Self {
        let mut cache = Self::default();
        for descriptor in iter {
            cache.insert(descriptor);
        }
        cache
    }
}
