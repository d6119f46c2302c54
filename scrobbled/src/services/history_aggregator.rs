//! Play count aggregation
//!
//! Groups play events by exact (artist, album, title). Keys are compared
//! verbatim; near-duplicates are reconciled later when two entries resolve
//! to the same catalog ID.

use scrobbled_common::{AggregatedTrack, PlayEvent, TrackKey};
use std::collections::HashMap;

/// Accumulates play counts; owned by the workflow for one run
#[derive(Debug, Default)]
pub struct HistoryAggregator {
    index: HashMap<TrackKey, usize>,
    tracks: Vec<AggregatedTrack>,
    total: u64,
}

impl HistoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &PlayEvent) {
        self.total += 1;
        let key = event.key();
        if let Some(&i) = self.index.get(&key) {
            self.tracks[i].scrobble_count += 1;
            return;
        }
        self.index.insert(key, self.tracks.len());
        self.tracks.push(AggregatedTrack {
            artist: event.artist.clone(),
            album: event.album.clone(),
            title: event.title.clone(),
            scrobble_count: 1,
        });
    }

    pub fn extend<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a PlayEvent>,
    {
        for event in events {
            self.record(event);
        }
    }

    /// Number of distinct keys
    pub fn distinct(&self) -> usize {
        self.tracks.len()
    }

    /// Number of events recorded
    pub fn total_scrobbles(&self) -> u64 {
        self.total
    }

    /// Tracks by descending count; ties keep first-seen order
    pub fn into_ranking(self) -> Vec<AggregatedTrack> {
        let mut tracks = self.tracks;
        tracks.sort_by(|a, b| b.scrobble_count.cmp(&a.scrobble_count));
        tracks
    }
}

/// Aggregate and rank in one call
pub fn aggregate(events: &[PlayEvent]) -> Vec<AggregatedTrack> {
    let mut aggregator = HistoryAggregator::new();
    aggregator.extend(events);
    aggregator.into_ranking()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(event: PlayEvent, n: usize) -> Vec<PlayEvent> {
        std::iter::repeat(event).take(n).collect()
    }

    #[test]
    fn test_counts_and_ranks() {
        let mut events = repeat(PlayEvent::new("A", "Alb", "T2"), 1);
        events.extend(repeat(PlayEvent::new("A", "Alb", "T1"), 3));

        let ranking = aggregate(&events);
        assert_eq!(
            ranking,
            vec![
                AggregatedTrack::new("A", "Alb", "T1", 3),
                AggregatedTrack::new("A", "Alb", "T2", 1),
            ]
        );
    }

    #[test]
    fn test_total_equals_input_length() {
        let events: Vec<PlayEvent> = (0..250)
            .map(|i| PlayEvent::new(format!("Artist {}", i % 7), "Album", format!("T{}", i % 13)))
            .collect();

        let mut aggregator = HistoryAggregator::new();
        aggregator.extend(&events);
        assert_eq!(aggregator.total_scrobbles(), 250);

        let ranking = aggregator.into_ranking();
        let summed: u64 = ranking.iter().map(|t| t.scrobble_count).sum();
        assert_eq!(summed, 250);
        assert!(ranking.windows(2).all(|w| w[0].scrobble_count >= w[1].scrobble_count));
    }

    #[test]
    fn test_no_normalization_at_this_stage() {
        let events = vec![
            PlayEvent::new("A", "Alb", "Song!"),
            PlayEvent::new("A", "Alb", "Song"),
            PlayEvent::new("a", "Alb", "Song"),
        ];
        let mut aggregator = HistoryAggregator::new();
        aggregator.extend(&events);
        assert_eq!(aggregator.distinct(), 3);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let events = vec![
            PlayEvent::new("A", "X", "first"),
            PlayEvent::new("A", "X", "second"),
            PlayEvent::new("A", "X", "third"),
        ];
        let titles: Vec<String> = aggregate(&events).into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
