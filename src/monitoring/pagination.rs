//! Lazy iteration over paginated listings

use futures::stream::{self, Stream, TryStreamExt};
use std::collections::VecDeque;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::monitoring::types::Page;

enum Cursor {
    First,
    Next(String),
    Exhausted,
}

/// Turn a page-fetching function into a stream of items
///
/// Pages are requested one at a time, only once the previous page has been
/// drained. A page without a next token ends the stream; an error ends it
/// after being yielded once.
pub fn paginate<T, F, Fut>(fetch_page: F) -> impl Stream<Item = Result<T, ApiError>>
where
    F: Fn(Option<String>) -> Fut + Clone,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    stream::try_unfold(
        (Cursor::First, VecDeque::new()),
        move |(mut cursor, mut buffered)| {
            let fetch_page = fetch_page.clone();
            async move {
                loop {
                    if let Some(item) = buffered.pop_front() {
                        return Ok(Some((item, (cursor, buffered))));
                    }
                    let token = match cursor {
                        Cursor::Exhausted => return Ok(None),
                        Cursor::First => None,
                        Cursor::Next(token) => Some(token),
                    };
                    let page = match fetch_page(token).await {
                        Ok(page) => page,
                        Err(e) => return Err(e),
                    };
                    cursor = match page.next_page_token {
                        Some(token) if !token.is_empty() => Cursor::Next(token),
                        _ => Cursor::Exhausted,
                    };
                    buffered.extend(page.items);
                }
            }
        },
    )
}

/// Advance a stream unless `cancel` fires first
pub async fn next_or_cancelled<S, T>(
    stream: &mut S,
    cancel: &CancellationToken,
) -> Result<Option<T>, ApiError>
where
    S: Stream<Item = Result<T, ApiError>> + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        next = stream.try_next() => next,
    }
}
