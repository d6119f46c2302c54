//! End-to-end run: history → ranking → catalog → playlist

use crate::clients::{CatalogApi, HistorySource, LastFmClient, SpotifyClient};
use crate::services::catalog_resolver::CatalogResolver;
use crate::services::history_aggregator::HistoryAggregator;
use crate::services::history_fetcher::fetch_history;
use crate::services::normalization::AliasTable;
use crate::services::playlist_publisher::{PlaylistPublisher, PublishReport};
use crate::services::query_builder::QueryCandidateBuilder;
use crate::services::requester::{RateLimitedRequester, RetryPolicy};
use crate::services::summary_writer::write_summary;
use crate::services::track_filter::TrackFilter;
use anyhow::{Context, Result};
use chrono::Utc;
use scrobbled_common::config::TomlConfig;
use scrobbled_common::PlaylistSpec;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Counts reported at the end of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scrobbles: usize,
    pub failed_pages: Vec<u32>,
    pub distinct_tracks: usize,
    pub denied: usize,
    pub resolved: usize,
    pub merged: usize,
    pub questionable: usize,
    pub not_found: usize,
    pub failed: usize,
    pub summary_path: PathBuf,
    pub publish: PublishReport,
}

/// Run the pipeline against the live Last.fm and Spotify APIs
pub async fn run(config: &TomlConfig) -> Result<RunSummary> {
    let token = config
        .require_access_token()
        .context("Spotify access token missing (run `scrobbled authorize`)")?;

    let history = LastFmClient::new(
        config.lastfm.user.clone(),
        config.lastfm.api_key.clone(),
        config.history.page_size,
    )
    .context("Failed to build Last.fm client")?;

    let catalog: Arc<dyn CatalogApi> =
        Arc::new(SpotifyClient::new(token).context("Failed to build Spotify client")?);

    run_with(&history, catalog, config).await
}

/// Run the pipeline against the given history source and catalog
pub async fn run_with(
    history: &dyn HistorySource,
    catalog: Arc<dyn CatalogApi>,
    config: &TomlConfig,
) -> Result<RunSummary> {
    // Fixed once so every history page describes the same window
    let to = Utc::now().timestamp();

    let history_requester = RateLimitedRequester::new(RetryPolicy::from(&config.retry));
    let catalog_requester = Arc::new(RateLimitedRequester::new(
        RetryPolicy::from(&config.retry).with_max_in_flight(config.resolver.concurrency),
    ));

    // Phase 1: history
    let fetched = fetch_history(history, &history_requester, to)
        .await
        .context("Failed to fetch first page of scrobble history")?;

    // Phase 2: aggregate and rank
    let mut aggregator = HistoryAggregator::new();
    aggregator.extend(&fetched.events);
    let distinct_tracks = aggregator.distinct();
    info!(
        scrobbles = aggregator.total_scrobbles(),
        distinct = distinct_tracks,
        "Aggregated scrobble history"
    );
    let ranking = aggregator.into_ranking();

    // Phase 3: denylist
    let filter = TrackFilter::with_entries(&config.filter.deny);
    let kept = filter.apply(ranking);
    let denied = distinct_tracks - kept.len();

    // Phase 4: catalog resolution
    let builder = QueryCandidateBuilder::new(AliasTable::with_extra(&config.aliases));
    let resolver = CatalogResolver::new(catalog.clone(), catalog_requester.clone(), builder)
        .with_config(&config.resolver);
    let mut report = resolver.resolve_all(kept).await;

    // Phase 5: merge, re-rank and cap
    let table = std::mem::take(&mut report.table);
    let resolved = table.len();
    let top = table.into_ranking(config.playlist.size);
    info!(
        resolved,
        merged = report.merged,
        selected = top.len(),
        "Final ranking built"
    );

    // Phase 6: summary file
    let summary_path = config.output.summary_path.clone();
    write_summary(&summary_path, &top, &report)
        .with_context(|| format!("Failed to write summary to {}", summary_path.display()))?;
    info!(path = %summary_path.display(), "Summary written");

    // Phase 7: playlist
    let spec = PlaylistSpec {
        name: config.playlist.name.clone(),
        description: config.playlist.description.clone(),
        public: config.playlist.public,
    };
    let publisher = PlaylistPublisher::new(catalog, catalog_requester)
        .with_batch_size(config.playlist.batch_size);
    let publish = publisher
        .publish(&spec, &top)
        .await
        .context("Failed to publish playlist")?;

    let summary = RunSummary {
        scrobbles: fetched.events.len(),
        failed_pages: fetched.failed_pages,
        distinct_tracks,
        denied,
        resolved,
        merged: report.merged,
        questionable: report.questionable.len(),
        not_found: report.not_found.len(),
        failed: report.failed.len(),
        summary_path,
        publish,
    };

    info!(
        scrobbles = summary.scrobbles,
        distinct = summary.distinct_tracks,
        denied = summary.denied,
        resolved = summary.resolved,
        questionable = summary.questionable,
        not_found = summary.not_found,
        tracks_added = summary.publish.tracks_added,
        playlist_id = %summary.publish.playlist_id,
        "Run complete"
    );

    Ok(summary)
}
