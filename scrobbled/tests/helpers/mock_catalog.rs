//! Scripted [`CatalogApi`] double
//!
//! Search answers come from an exact query table, then from an optional
//! fallback closure. Every call is recorded so tests can assert on call
//! counts and order.

use async_trait::async_trait;
use scrobbled::clients::{CatalogApi, CatalogError};
use scrobbled_common::PlaylistSpec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Fallback = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;

pub struct MockCatalog {
    hits: HashMap<String, Vec<String>>,
    fallback: Option<Fallback>,
    /// Remaining searches to answer with a rate limit
    rate_limited_searches: AtomicU32,
    retry_after: Duration,
    failing_queries: HashSet<String>,
    fail_create: bool,
    failing_batches: HashSet<usize>,
    /// Simulated latency of each search
    search_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,

    pub searches: Mutex<Vec<String>>,
    pub created: Mutex<Vec<PlaylistSpec>>,
    /// Every add attempt, including failed ones
    pub add_attempts: Mutex<Vec<Vec<String>>>,
    /// Batches that were accepted
    pub added: Mutex<Vec<Vec<String>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            hits: HashMap::new(),
            fallback: None,
            rate_limited_searches: AtomicU32::new(0),
            retry_after: Duration::from_secs(1),
            failing_queries: HashSet::new(),
            fail_create: false,
            failing_batches: HashSet::new(),
            search_delay: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            searches: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            add_attempts: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
        }
    }

    /// Answer `query` with a single catalog ID
    pub fn with_hit(mut self, query: &str, catalog_id: &str) -> Self {
        self.hits.insert(query.to_string(), vec![catalog_id.to_string()]);
        self
    }

    /// Answer queries missing from the table with `f`
    pub fn with_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(f));
        self
    }

    /// Rate-limit the first `count` searches with the given interval
    pub fn rate_limit_first(mut self, count: u32, retry_after: Duration) -> Self {
        self.rate_limited_searches = AtomicU32::new(count);
        self.retry_after = retry_after;
        self
    }

    /// Fail searches for `query` with a server error
    pub fn with_failing_query(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail the add call for the zero-based batch `index`
    pub fn with_failing_batch(mut self, index: usize) -> Self {
        self.failing_batches.insert(index);
        self
    }

    /// Hold every search open for `delay` so overlapping calls are visible
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// Most searches that were ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn search_log(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    /// Track URIs in the order they landed on the playlist
    pub fn playlist_uris(&self) -> Vec<String> {
        self.added.lock().unwrap().iter().flatten().cloned().collect()
    }

    fn answer(&self, query: &str) -> Result<Vec<String>, CatalogError> {
        let limited = self
            .rate_limited_searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(CatalogError::RateLimited {
                retry_after: self.retry_after,
            });
        }

        if self.failing_queries.contains(query) {
            return Err(CatalogError::Api(500, "internal error".to_string()));
        }

        if let Some(ids) = self.hits.get(query) {
            return Ok(ids.clone());
        }
        Ok(self.fallback.as_ref().map(|f| f(query)).unwrap_or_default())
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn search_tracks(&self, query: &str) -> Result<Vec<String>, CatalogError> {
        self.searches.lock().unwrap().push(query.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        match self.search_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        let result = self.answer(query);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn create_playlist(&self, spec: &PlaylistSpec) -> Result<String, CatalogError> {
        if self.fail_create {
            return Err(CatalogError::Unauthorized);
        }
        self.created.lock().unwrap().push(spec.clone());
        Ok("playlist-1".to_string())
    }

    async fn add_tracks(
        &self,
        _playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), CatalogError> {
        let index = {
            let mut attempts = self.add_attempts.lock().unwrap();
            attempts.push(track_uris.to_vec());
            attempts.len() - 1
        };
        if self.failing_batches.contains(&index) {
            return Err(CatalogError::Api(502, "bad gateway".to_string()));
        }
        self.added.lock().unwrap().push(track_uris.to_vec());
        Ok(())
    }
}
