//! Paged [`HistorySource`] double

use async_trait::async_trait;
use scrobbled::clients::{HistoryError, HistoryPage, HistorySource};
use scrobbled_common::PlayEvent;

pub struct MockHistory {
    pages: Vec<Vec<PlayEvent>>,
}

impl MockHistory {
    /// Split `events` into pages of `page_size`
    pub fn paged(events: Vec<PlayEvent>, page_size: usize) -> Self {
        let pages = events.chunks(page_size.max(1)).map(<[PlayEvent]>::to_vec).collect();
        Self { pages }
    }
}

#[async_trait]
impl HistorySource for MockHistory {
    async fn fetch_page(&self, page: u32, _to: i64) -> Result<HistoryPage, HistoryError> {
        let events = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(HistoryPage {
            events,
            total_pages: self.pages.len() as u32,
        })
    }
}
