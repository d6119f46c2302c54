//! Domain models shared across the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scrobble as reported by the history source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Scrobble time; `None` only for events built outside a history page
    pub played_at: Option<DateTime<Utc>>,
}

impl PlayEvent {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
            played_at: None,
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey {
            artist: self.artist.clone(),
            album: self.album.clone(),
            title: self.title.clone(),
        }
    }
}

/// Exact, case-sensitive grouping key for aggregation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub artist: String,
    pub album: String,
    pub title: String,
}

/// A distinct (artist, album, title) with its play count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedTrack {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub scrobble_count: u64,
}

impl AggregatedTrack {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        title: impl Into<String>,
        scrobble_count: u64,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
            scrobble_count,
        }
    }
}

/// How far down the candidate chain a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Confident,
    Questionable,
    HighlyQuestionable,
}

impl Confidence {
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Confidence::Confident)
    }

    /// Marker used in log lines and the summary file
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::Confident => "CONFIDENT",
            Confidence::Questionable => "QUESTIONABLE",
            Confidence::HighlyQuestionable => "HIGHLY QUESTIONABLE",
        }
    }
}

/// A track resolved to a catalog identifier
///
/// `source` holds the metadata of the first history entry that resolved to
/// `catalog_id`; later entries only add to `scrobble_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub catalog_id: String,
    pub scrobble_count: u64,
    pub confidence: Confidence,
    pub source: AggregatedTrack,
}

/// Metadata for the playlist created on the catalog service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSpec {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_sensitive() {
        let a = PlayEvent::new("Artist", "Album", "Song");
        let b = PlayEvent::new("artist", "Album", "Song");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_confidence_labels() {
        assert!(!Confidence::Confident.is_flagged());
        assert!(Confidence::Questionable.is_flagged());
        assert_eq!(Confidence::HighlyQuestionable.label(), "HIGHLY QUESTIONABLE");
    }
}
