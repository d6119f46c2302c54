//! Test Helper Utilities
//!
//! In-memory catalog and history doubles for exercising the pipeline without
//! network access.

#![allow(dead_code)]

pub mod mock_catalog;
pub mod mock_history;

pub use mock_catalog::MockCatalog;
pub use mock_history::MockHistory;

use scrobbled_common::{AggregatedTrack, Confidence, ResolvedTrack};

/// Resolved track whose catalog ID and title are derived from `n`
pub fn resolved_track(n: usize, scrobble_count: u64) -> ResolvedTrack {
    ResolvedTrack {
        catalog_id: format!("id{}", n),
        scrobble_count,
        confidence: Confidence::Confident,
        source: AggregatedTrack::new("Artist", "Album", &format!("Track {}", n), scrobble_count),
    }
}
