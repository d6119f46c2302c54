//! Pipeline components
//!
//! Leaves first: aggregation and filtering of history, candidate generation
//! and normalization, rate-limited requests, catalog resolution, playlist
//! publication and the summary file.

pub mod catalog_resolver;
pub mod history_aggregator;
pub mod history_fetcher;
pub mod normalization;
pub mod playlist_publisher;
pub mod query_builder;
pub mod requester;
pub mod summary_writer;
pub mod track_filter;

pub use catalog_resolver::{
    CatalogResolver, ConfidenceThresholds, FlaggedMatch, Outcome, ResolutionReport, ResolvedTable,
};
pub use history_aggregator::HistoryAggregator;
pub use history_fetcher::{fetch_history, FetchedHistory};
pub use playlist_publisher::{PlaylistPublisher, PublishError, PublishReport};
pub use query_builder::{CandidateChain, QueryCandidate, QueryCandidateBuilder, StructuredQuery};
pub use requester::{RateLimitedRequester, RequestError, RetryAfter, RetryPolicy};
pub use track_filter::{DenyRule, TrackFilter};
