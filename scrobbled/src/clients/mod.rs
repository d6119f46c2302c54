//! External API clients
//!
//! The pipeline talks to two services through the traits below so the
//! matching and publishing logic can run against in-memory fakes in tests.

pub mod lastfm_client;
pub mod spotify_client;

pub use lastfm_client::{HistoryError, LastFmClient};
pub use spotify_client::{CatalogError, SpotifyClient};

use async_trait::async_trait;
use scrobbled_common::{PlayEvent, PlaylistSpec};

/// Searchable streaming catalog with playlist support
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Catalog IDs matching `query`, best first
    async fn search_tracks(&self, query: &str) -> Result<Vec<String>, CatalogError>;

    /// Create a playlist and return its ID
    async fn create_playlist(&self, spec: &PlaylistSpec) -> Result<String, CatalogError>;

    /// Append track URIs to the end of a playlist (at most 100 per call)
    async fn add_tracks(
        &self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), CatalogError>;
}

/// One page of scrobble history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub events: Vec<PlayEvent>,
    pub total_pages: u32,
}

/// Paginated, read-only scrobble history
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch page `page` (1-based) of plays recorded at or before `to`
    /// (unix seconds)
    async fn fetch_page(&self, page: u32, to: i64) -> Result<HistoryPage, HistoryError>;
}
