//! Denylist filter for corrupted history entries
//!
//! Some scrobbles are known to be wrong: mislabeled re-releases, leaked
//! albums, clean-edit duplicates. They are dropped before resolution.

use scrobbled_common::config::DenyEntry;
use scrobbled_common::AggregatedTrack;
use tracing::info;

/// Exact-match rule; `None` fields match anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyRule {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub name: Option<String>,
}

impl DenyRule {
    pub fn matches(&self, track: &AggregatedTrack) -> bool {
        fn field_matches(rule: &Option<String>, value: &str) -> bool {
            rule.as_deref().map_or(true, |expected| expected == value)
        }

        // A rule with no fields would deny everything
        if self.artist.is_none() && self.album.is_none() && self.name.is_none() {
            return false;
        }

        field_matches(&self.artist, &track.artist)
            && field_matches(&self.album, &track.album)
            && field_matches(&self.name, &track.title)
    }
}

impl From<&DenyEntry> for DenyRule {
    fn from(entry: &DenyEntry) -> Self {
        Self {
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            name: entry.name.clone(),
        }
    }
}

/// (artist, album, name) of the built-in denylist
pub const DEFAULT_DENYLIST: &[(Option<&str>, Option<&str>, Option<&str>)] = &[
    (Some("Travi$ Scott"), None, None),
    (None, Some("Chixtape 4"), None),
    (None, Some("WLR"), None),
    (None, Some("Donda 2"), None),
    (None, Some("Lost Cause"), None),
    (Some("Travis Scott"), None, Some("A man")),
    (Some("Travis Scott"), None, Some("Smoke Drink Pop - Single")),
    (Some("Travis Scott"), None, Some("sdp interlude (Extended)")),
    (Some("Bryson Tiller"), None, Some("Break Bread (feat. Vory)")),
];

/// Pure, order-preserving denylist filter
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    rules: Vec<DenyRule>,
}

impl TrackFilter {
    pub fn new(rules: Vec<DenyRule>) -> Self {
        Self { rules }
    }

    /// Built-in denylist
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_DENYLIST
                .iter()
                .map(|(artist, album, name)| DenyRule {
                    artist: artist.map(str::to_string),
                    album: album.map(str::to_string),
                    name: name.map(str::to_string),
                })
                .collect(),
        )
    }

    /// Built-in denylist plus configured entries
    pub fn with_entries(entries: &[DenyEntry]) -> Self {
        let mut filter = Self::builtin();
        filter.rules.extend(entries.iter().map(DenyRule::from));
        filter
    }

    pub fn rules(&self) -> &[DenyRule] {
        &self.rules
    }

    pub fn is_denied(&self, track: &AggregatedTrack) -> bool {
        self.rules.iter().any(|rule| rule.matches(track))
    }

    pub fn apply(&self, tracks: Vec<AggregatedTrack>) -> Vec<AggregatedTrack> {
        let before = tracks.len();
        let kept: Vec<AggregatedTrack> = tracks
            .into_iter()
            .filter(|track| !self.is_denied(track))
            .collect();

        info!(
            kept = kept.len(),
            removed = before - kept.len(),
            "Applied denylist"
        );
        kept
    }
}
