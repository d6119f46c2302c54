//! Complete scrobble history retrieval
//!
//! Page 1 is fetched first to learn the page count; every remaining page is
//! then requested at once. The `to` bound is fixed before the first request
//! so concurrently fetched pages describe the same window.

use crate::clients::{HistoryError, HistorySource};
use crate::services::requester::{RateLimitedRequester, RequestError};
use futures::future::join_all;
use scrobbled_common::PlayEvent;
use tracing::{info, warn};

/// Outcome of a full history fetch
#[derive(Debug, Default)]
pub struct FetchedHistory {
    pub events: Vec<PlayEvent>,
    pub total_pages: u32,
    /// Pages after the first that could not be fetched
    pub failed_pages: Vec<u32>,
}

/// Fetch every page up to `to`
///
/// A failure on page 1 is returned as an error; later page failures are
/// logged and recorded in [`FetchedHistory::failed_pages`].
pub async fn fetch_history(
    source: &dyn HistorySource,
    requester: &RateLimitedRequester,
    to: i64,
) -> Result<FetchedHistory, RequestError<HistoryError>> {
    let first = requester
        .call("history page 1", || source.fetch_page(1, to))
        .await?;

    let total_pages = first.total_pages.max(1);
    info!(total_pages, to, "Fetching scrobble history");

    let mut history = FetchedHistory {
        events: first.events,
        total_pages,
        failed_pages: Vec::new(),
    };

    let remaining = join_all((2..=total_pages).map(|page| async move {
        let label = format!("history page {}", page);
        let result = requester.call(&label, || source.fetch_page(page, to)).await;
        (page, result)
    }))
    .await;

    for (page, result) in remaining {
        match result {
            Ok(fetched) => history.events.extend(fetched.events),
            Err(e) => {
                warn!(page, error = %e, "Skipping history page");
                history.failed_pages.push(page);
            }
        }
    }

    info!(
        scrobbles = history.events.len(),
        pages = total_pages,
        failed_pages = history.failed_pages.len(),
        "Scrobble history fetched"
    );

    Ok(history)
}
