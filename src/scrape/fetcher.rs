//! Time-series retrieval

use futures::Stream;
use std::sync::Arc;

use crate::error::ApiError;
use crate::monitoring::{MonitoringApi, TimeSeries, paginate};
use crate::scrape::window::TimeWindow;

/// Lazily list every time series matching `filter` within `window`
///
/// Nothing is requested until the stream is polled. The stream cannot be
/// rewound; call again to restart from the first page.
pub fn fetch_time_series(
    api: Arc<dyn MonitoringApi>,
    project_id: &str,
    filter: String,
    window: TimeWindow,
) -> impl Stream<Item = Result<TimeSeries, ApiError>> + Send {
    let project_id: Arc<str> = Arc::from(project_id);
    let filter: Arc<str> = Arc::from(filter);

    paginate(move |page_token: Option<String>| {
        let api = api.clone();
        let project_id = project_id.clone();
        let filter = filter.clone();
        async move {
            api.list_time_series(&project_id, &filter, &window, page_token.as_deref())
                .await
        }
    })
}
