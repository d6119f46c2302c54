//! Catalog resolution
//!
//! Resolves aggregated tracks to catalog IDs. Each track walks its candidate
//! chain strictly in order and stops at the first query that returns a hit.
//! Tracks are resolved concurrently up to the configured limit, and results
//! are folded into a [`ResolvedTable`] by the single consuming loop, so no
//! locking is needed around the merge.

use crate::clients::CatalogApi;
use crate::services::query_builder::{CandidateChain, QueryCandidateBuilder};
use crate::services::requester::RateLimitedRequester;
use futures::stream::{self, StreamExt};
use scrobbled_common::config::ResolverConfig;
use scrobbled_common::{AggregatedTrack, Confidence, ResolvedTrack};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Depth thresholds for flagging matches
///
/// A match at zero-based candidate index `i` is questionable once
/// `i >= questionable_factor * artist_count + 1` and highly questionable once
/// `i >= highly_questionable_factor * artist_count + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceThresholds {
    pub questionable_factor: usize,
    pub highly_questionable_factor: usize,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            questionable_factor: 2,
            highly_questionable_factor: 3,
        }
    }
}

impl ConfidenceThresholds {
    pub fn classify(&self, candidate_index: usize, artist_count: usize) -> Confidence {
        let artist_count = artist_count.max(1);
        let tier_start = |factor: usize| factor.saturating_mul(artist_count).saturating_add(1);
        if candidate_index >= tier_start(self.highly_questionable_factor) {
            Confidence::HighlyQuestionable
        } else if candidate_index >= tier_start(self.questionable_factor) {
            Confidence::Questionable
        } else {
            Confidence::Confident
        }
    }
}

/// Result of walking one candidate chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Matched {
        catalog_id: String,
        confidence: Confidence,
        candidate_index: usize,
        query: String,
    },
    NotFound,
    /// A search call failed for a reason other than rate limiting
    Failed(String),
}

/// Catalog ID keyed merge table
#[derive(Debug, Default)]
pub struct ResolvedTable {
    index: HashMap<String, usize>,
    entries: Vec<ResolvedTrack>,
}

impl ResolvedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolution; returns `true` when it merged into an existing entry
    ///
    /// On merge the count is summed and the first entry's metadata and
    /// confidence are kept.
    pub fn insert(
        &mut self,
        catalog_id: &str,
        confidence: Confidence,
        source: AggregatedTrack,
    ) -> bool {
        if let Some(&i) = self.index.get(catalog_id) {
            self.entries[i].scrobble_count += source.scrobble_count;
            return true;
        }
        self.index.insert(catalog_id.to_string(), self.entries.len());
        self.entries.push(ResolvedTrack {
            catalog_id: catalog_id.to_string(),
            scrobble_count: source.scrobble_count,
            confidence,
            source,
        });
        false
    }

    pub fn get(&self, catalog_id: &str) -> Option<&ResolvedTrack> {
        self.index.get(catalog_id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by descending merged count, capped at `limit`
    ///
    /// The sort is stable, so ties keep insertion (completion) order.
    pub fn into_ranking(self, limit: usize) -> Vec<ResolvedTrack> {
        rank_resolved(self.entries, limit)
    }
}

/// Stable sort by descending count, then truncate
pub fn rank_resolved(mut tracks: Vec<ResolvedTrack>, limit: usize) -> Vec<ResolvedTrack> {
    tracks.sort_by(|a, b| b.scrobble_count.cmp(&a.scrobble_count));
    tracks.truncate(limit);
    tracks
}

/// A match accepted deep in the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedMatch {
    pub track: AggregatedTrack,
    pub catalog_id: String,
    pub confidence: Confidence,
    pub query: String,
}

/// Everything one resolution pass produced
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub table: ResolvedTable,
    pub questionable: Vec<FlaggedMatch>,
    pub not_found: Vec<AggregatedTrack>,
    pub failed: Vec<(AggregatedTrack, String)>,
    /// Resolutions that merged into an earlier catalog ID
    pub merged: usize,
}

/// Resolves tracks against the catalog
pub struct CatalogResolver {
    catalog: Arc<dyn CatalogApi>,
    requester: Arc<RateLimitedRequester>,
    builder: QueryCandidateBuilder,
    thresholds: ConfidenceThresholds,
    concurrency: usize,
    progress_interval: usize,
}

impl CatalogResolver {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        requester: Arc<RateLimitedRequester>,
        builder: QueryCandidateBuilder,
    ) -> Self {
        Self {
            catalog,
            requester,
            builder,
            thresholds: ConfidenceThresholds::default(),
            concurrency: 25,
            progress_interval: 50,
        }
    }

    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.thresholds = ConfidenceThresholds {
            questionable_factor: config.questionable_factor,
            highly_questionable_factor: config.highly_questionable_factor,
        };
        self.concurrency = config.concurrency.max(1);
        self.progress_interval = config.progress_interval.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Walk `chain` in order; the first candidate with a hit wins
    pub async fn resolve_chain(&self, chain: &CandidateChain) -> Outcome {
        for (index, candidate) in chain.candidates.iter().enumerate() {
            let query = candidate.to_query_string();
            if query.is_empty() {
                debug!(index, "Skipping empty candidate");
                continue;
            }

            let hits = match self
                .requester
                .call("search", || self.catalog.search_tracks(&query))
                .await
            {
                Ok(hits) => hits,
                Err(e) => return Outcome::Failed(e.to_string()),
            };

            if let Some(catalog_id) = hits.into_iter().next() {
                return Outcome::Matched {
                    catalog_id,
                    confidence: self.thresholds.classify(index, chain.artist_count),
                    candidate_index: index,
                    query,
                };
            }
        }
        Outcome::NotFound
    }

    /// Build the candidate chain for `track` and resolve it
    pub async fn resolve_one(&self, track: &AggregatedTrack) -> Outcome {
        let chain = self.builder.build(track);
        self.resolve_chain(&chain).await
    }

    /// Resolve every track with bounded concurrency and merge by catalog ID
    pub async fn resolve_all(&self, tracks: Vec<AggregatedTrack>) -> ResolutionReport {
        let total = tracks.len();
        let mut report = ResolutionReport::default();

        info!(
            tracks = total,
            concurrency = self.concurrency,
            "Resolving tracks against catalog"
        );

        let mut results = stream::iter(tracks.into_iter().enumerate())
            .map(|(rank, track)| async move {
                let outcome = self.resolve_one(&track).await;
                (rank, track, outcome)
            })
            .buffer_unordered(self.concurrency);

        let mut done = 0usize;
        while let Some((rank, track, outcome)) = results.next().await {
            done += 1;
            match outcome {
                Outcome::Matched {
                    catalog_id,
                    confidence,
                    candidate_index,
                    query,
                } => {
                    if confidence.is_flagged() {
                        warn!(
                            rank,
                            total,
                            artist = %track.artist,
                            album = %track.album,
                            title = %track.title,
                            candidate = candidate_index,
                            query = %query,
                            "{}",
                            confidence.label()
                        );
                        report.questionable.push(FlaggedMatch {
                            track: track.clone(),
                            catalog_id: catalog_id.clone(),
                            confidence,
                            query,
                        });
                    }
                    if report.table.insert(&catalog_id, confidence, track) {
                        report.merged += 1;
                        debug!(catalog_id = %catalog_id, "Merged into existing catalog entry");
                    }
                }
                Outcome::NotFound => {
                    warn!(
                        rank,
                        total,
                        artist = %track.artist,
                        album = %track.album,
                        title = %track.title,
                        "NOT FOUND"
                    );
                    report.not_found.push(track);
                }
                Outcome::Failed(reason) => {
                    warn!(
                        rank,
                        artist = %track.artist,
                        title = %track.title,
                        error = %reason,
                        "Resolution failed, dropping track"
                    );
                    report.failed.push((track, reason));
                }
            }

            if done % self.progress_interval == 0 || done == total {
                info!(progress = format!("{}/{}", done, total), "Resolution progress");
            }
        }

        info!(
            resolved = report.table.len(),
            merged = report.merged,
            questionable = report.questionable.len(),
            not_found = report.not_found.len(),
            failed = report.failed.len(),
            "Catalog resolution complete"
        );

        report
    }
}
