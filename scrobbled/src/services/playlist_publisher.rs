//! Playlist publication
//!
//! Creates the playlist, then appends ranked track IDs in batches, one batch
//! in flight at a time, so the playlist order mirrors the ranking.

use crate::clients::{CatalogApi, CatalogError};
use crate::services::requester::{RateLimitedRequester, RequestError};
use scrobbled_common::config::{MAX_BATCH_SIZE, MAX_PLAYLIST_SIZE};
use scrobbled_common::{PlaylistSpec, ResolvedTrack};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Publication errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// Nothing can be appended without a playlist ID
    #[error("Failed to create playlist: {0}")]
    CreatePlaylist(RequestError<CatalogError>),
}

/// Batch that could not be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub index: usize,
    pub track_count: usize,
    pub error: String,
}

/// What ended up on the remote playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub playlist_id: String,
    pub batches_sent: usize,
    pub tracks_added: usize,
    pub failed_batches: Vec<FailedBatch>,
}

/// Catalog URI for a track ID
pub fn track_uri(catalog_id: &str) -> String {
    format!("spotify:track:{}", catalog_id)
}

/// Publishes ranked tracks to a new playlist
pub struct PlaylistPublisher {
    catalog: Arc<dyn CatalogApi>,
    requester: Arc<RateLimitedRequester>,
    batch_size: usize,
}

impl PlaylistPublisher {
    pub fn new(catalog: Arc<dyn CatalogApi>, requester: Arc<RateLimitedRequester>) -> Self {
        Self {
            catalog,
            requester,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Batch size, clamped to 1..=100
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Create the playlist and append `tracks` in order
    ///
    /// `tracks` is expected to be ranked and capped already; anything past
    /// the playlist limit is ignored.
    pub async fn publish(
        &self,
        spec: &PlaylistSpec,
        tracks: &[ResolvedTrack],
    ) -> Result<PublishReport, PublishError> {
        let tracks = if tracks.len() > MAX_PLAYLIST_SIZE {
            warn!(
                tracks = tracks.len(),
                limit = MAX_PLAYLIST_SIZE,
                "Track list exceeds playlist limit, truncating"
            );
            &tracks[..MAX_PLAYLIST_SIZE]
        } else {
            tracks
        };

        let playlist_id = self
            .requester
            .call("create playlist", || self.catalog.create_playlist(spec))
            .await
            .map_err(PublishError::CreatePlaylist)?;

        info!(
            playlist_id = %playlist_id,
            tracks = tracks.len(),
            batch_size = self.batch_size,
            "Adding tracks to playlist"
        );

        let mut report = PublishReport {
            playlist_id,
            batches_sent: 0,
            tracks_added: 0,
            failed_batches: Vec::new(),
        };

        let batch_count = tracks.len().div_ceil(self.batch_size);
        for (index, batch) in tracks.chunks(self.batch_size).enumerate() {
            let uris: Vec<String> = batch.iter().map(|t| track_uri(&t.catalog_id)).collect();
            let label = format!("add batch {}", index + 1);

            let result = self
                .requester
                .call(&label, || self.catalog.add_tracks(&report.playlist_id, &uris))
                .await;

            match result {
                Ok(()) => {
                    report.batches_sent += 1;
                    report.tracks_added += uris.len();
                    info!(
                        progress = format!("{}/{}", index + 1, batch_count),
                        tracks_added = report.tracks_added,
                        "Playlist batch added"
                    );
                }
                Err(e) => {
                    warn!(batch = index + 1, error = %e, "Failed to add batch, skipping");
                    report.failed_batches.push(FailedBatch {
                        index,
                        track_count: uris.len(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            playlist_id = %report.playlist_id,
            tracks_added = report.tracks_added,
            failed_batches = report.failed_batches.len(),
            "Playlist published"
        );

        Ok(report)
    }
}
