//! In-memory monitoring API shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gcp_monitoring_receiver::config::{Config, ConfigBuilder, MetricConfig};
use gcp_monitoring_receiver::error::ApiError;
use gcp_monitoring_receiver::monitoring::{
    MetricDescriptor, MetricKind, MonitoringApi, Page, Point, TimeInterval, TimeSeries, TypedValue,
};
use gcp_monitoring_receiver::scrape::TimeWindow;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const CPU_METRIC: &str = "compute.googleapis.com/instance/cpu/usage_time";
pub const FLEX_CPU_METRIC: &str = "connectors.googleapis.com/flex/instance/cpu/usage_time";
pub const PROJECT_ID: &str = "my-project-id";

/// Fixed "now" used by tests that check query windows
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn config(metrics: &[&str]) -> Config {
    ConfigBuilder::new()
        .project_id(PROJECT_ID)
        .collection_interval_secs(120)
        .metrics(metrics.iter().map(|m| MetricConfig::new(*m, 60)).collect())
        .access_token("test-token")
        .build()
        .unwrap()
}

pub fn descriptor(metric_type: &str, kind: MetricKind) -> MetricDescriptor {
    MetricDescriptor {
        name: format!("projects/{}/metricDescriptors/{}", PROJECT_ID, metric_type),
        metric_type: metric_type.to_string(),
        display_name: metric_type.rsplit('/').next().unwrap_or_default().to_string(),
        description: format!("Description of {}", metric_type),
        unit: "s".to_string(),
        metric_kind: kind,
        value_type: "DOUBLE".to_string(),
    }
}

/// A single-point series on a `gce_instance` resource
pub fn series(metric_type: &str, instance: &str, value: f64) -> TimeSeries {
    let mut series = TimeSeries::default();
    series.metric.metric_type = metric_type.to_string();
    series.resource.resource_type = "gce_instance".to_string();
    series
        .resource
        .labels
        .insert("instance_id".to_string(), instance.to_string());
    series
        .resource
        .labels
        .insert("zone".to_string(), "us-central1-a".to_string());
    series.points = vec![Point {
        interval: TimeInterval {
            start_time: Some(now() - chrono::TimeDelta::minutes(4)),
            end_time: now() - chrono::TimeDelta::minutes(2),
        },
        value: TypedValue::Double(value),
    }];
    series
}

/// Metric type named by a `metric.type = "<name>"` filter
pub fn metric_type_of(filter: &str) -> Option<&str> {
    filter
        .strip_prefix("metric.type = \"")
        .and_then(|rest| rest.strip_suffix('"'))
}

/// Scripted [`MonitoringApi`]
///
/// Descriptors and time series are served page by page; the page token is
/// the index of the next page.
#[derive(Default)]
pub struct FakeMonitoringApi {
    descriptors: Vec<MetricDescriptor>,
    descriptor_pages: HashMap<String, Vec<Vec<MetricDescriptor>>>,
    series: HashMap<String, Vec<Vec<TimeSeries>>>,
    /// Metric type -> first page index that fails
    failing_series: HashMap<String, usize>,
    failing_descriptors: AtomicBool,
    /// Descriptor calls from this index on fail
    failing_descriptor_call: Option<usize>,
    pub descriptor_calls: Mutex<Vec<String>>,
    pub series_calls: Mutex<Vec<(String, TimeWindow)>>,
}

impl FakeMonitoringApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descriptor(mut self, descriptor: MetricDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Serve descriptor `pages` for the filter naming `metric_type`
    pub fn with_descriptor_pages(
        mut self,
        metric_type: &str,
        pages: Vec<Vec<MetricDescriptor>>,
    ) -> Self {
        self.descriptor_pages.insert(metric_type.to_string(), pages);
        self
    }

    /// Serve `pages` for `metric_type`, in order
    pub fn with_series_pages(mut self, metric_type: &str, pages: Vec<Vec<TimeSeries>>) -> Self {
        self.series.insert(metric_type.to_string(), pages);
        self
    }

    pub fn with_series(self, metric_type: &str, series: Vec<TimeSeries>) -> Self {
        self.with_series_pages(metric_type, vec![series])
    }

    pub fn failing_series_for(self, metric_type: &str) -> Self {
        self.failing_series_from_page(metric_type, 0)
    }

    /// Serve pages before `page` normally, then fail
    pub fn failing_series_from_page(mut self, metric_type: &str, page: usize) -> Self {
        self.failing_series.insert(metric_type.to_string(), page);
        self
    }

    /// Let the first `calls` descriptor listings succeed, then fail
    pub fn failing_descriptors_after(mut self, calls: usize) -> Self {
        self.failing_descriptor_call = Some(calls);
        self
    }

    pub fn failing_descriptors(self) -> Self {
        self.set_failing_descriptors(true);
        self
    }

    pub fn set_failing_descriptors(&self, failing: bool) {
        self.failing_descriptors.store(failing, Ordering::SeqCst);
    }

    pub fn series_call_count(&self) -> usize {
        self.series_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MonitoringApi for FakeMonitoringApi {
    async fn list_metric_descriptors(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<Page<MetricDescriptor>, ApiError> {
        assert_eq!(project_id, PROJECT_ID);
        let call = {
            let mut calls = self.descriptor_calls.lock().unwrap();
            calls.push(filter.to_string());
            calls.len() - 1
        };

        let failing_call = self.failing_descriptor_call.is_some_and(|n| call >= n);
        if failing_call || self.failing_descriptors.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 403,
                message: "Permission monitoring.metricDescriptors.list denied".to_string(),
            });
        }

        let wanted = metric_type_of(filter).unwrap_or_default();
        let pages = match self.descriptor_pages.get(wanted) {
            Some(pages) => pages.clone(),
            None => vec![
                self.descriptors
                    .iter()
                    .filter(|d| d.metric_type == wanted)
                    .cloned()
                    .collect(),
            ],
        };
        Ok(serve_page(pages, page_token))
    }

    async fn list_time_series(
        &self,
        project_id: &str,
        filter: &str,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<Page<TimeSeries>, ApiError> {
        assert_eq!(project_id, PROJECT_ID);
        self.series_calls
            .lock()
            .unwrap()
            .push((filter.to_string(), *window));

        let metric_type = metric_type_of(filter).unwrap_or_default();
        let index = page_index(page_token);
        if self
            .failing_series
            .get(metric_type)
            .is_some_and(|&first| index >= first)
        {
            return Err(ApiError::Status {
                status: 503,
                message: "The service is currently unavailable.".to_string(),
            });
        }

        let pages = self.series.get(metric_type).cloned().unwrap_or_default();
        Ok(serve_page(pages, page_token))
    }
}

fn page_index(page_token: Option<&str>) -> usize {
    page_token.map(|t| t.parse().unwrap()).unwrap_or(0)
}

fn serve_page<T: Clone>(pages: Vec<Vec<T>>, page_token: Option<&str>) -> Page<T> {
    let index = page_index(page_token);
    let items = pages.get(index).cloned().unwrap_or_default();
    if index + 1 < pages.len() {
        Page::with_next(items, (index + 1).to_string())
    } else {
        Page::last(items)
    }
}
