//! Catalog resolution against a scripted catalog

mod helpers;

use helpers::MockCatalog;
use scrobbled::services::catalog_resolver::{CatalogResolver, Outcome};
use scrobbled::services::normalization::AliasTable;
use scrobbled::services::query_builder::{CandidateChain, QueryCandidateBuilder};
use scrobbled::services::requester::{RateLimitedRequester, RetryPolicy};
use scrobbled_common::{AggregatedTrack, Confidence};
use std::sync::Arc;
use std::time::Duration;

fn resolver(catalog: Arc<MockCatalog>) -> CatalogResolver {
    CatalogResolver::new(
        catalog,
        Arc::new(RateLimitedRequester::default()),
        QueryCandidateBuilder::new(AliasTable::builtin()),
    )
}

#[tokio::test]
async fn test_chain_stops_at_first_hit() {
    let catalog = Arc::new(MockCatalog::new().with_hit("loose2", "cat-42"));
    let chain = CandidateChain::from_free_text(["exact", "loose1", "loose2", "loose3"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert_eq!(catalog.search_log(), vec!["exact", "loose1", "loose2"]);
    match outcome {
        Outcome::Matched {
            catalog_id,
            candidate_index,
            confidence,
            query,
        } => {
            assert_eq!(catalog_id, "cat-42");
            assert_eq!(candidate_index, 2);
            // Third candidate of a one-artist chain is still within the
            // confident tier (indices 0..=2)
            assert_eq!(confidence, Confidence::Confident);
            assert_eq!(query, "loose2");
        }
        other => panic!("expected match, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deep_hit_is_flagged() {
    let catalog = Arc::new(MockCatalog::new().with_hit("q4", "deep"));
    let chain = CandidateChain::from_free_text(["q0", "q1", "q2", "q3", "q4"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert_eq!(catalog.search_count(), 5);
    assert!(matches!(
        outcome,
        Outcome::Matched {
            confidence: Confidence::HighlyQuestionable,
            candidate_index: 4,
            ..
        }
    ));
}

#[tokio::test]
async fn test_exhausted_chain_is_not_found() {
    let catalog = Arc::new(MockCatalog::new());
    let chain = CandidateChain::from_free_text(["a", "b", "c"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(catalog.search_count(), 3);
}

#[tokio::test]
async fn test_empty_candidates_are_skipped() {
    let catalog = Arc::new(MockCatalog::new().with_hit("real", "x"));
    let chain = CandidateChain::from_free_text(["", "   ", "real"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert_eq!(catalog.search_log(), vec!["real"]);
    assert!(matches!(outcome, Outcome::Matched { candidate_index: 2, .. }));
}

#[tokio::test]
async fn test_non_rate_limit_failure_gives_up_track() {
    let catalog = Arc::new(
        MockCatalog::new()
            .with_failing_query("first")
            .with_hit("second", "never"),
    );
    let chain = CandidateChain::from_free_text(["first", "second"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(catalog.search_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_waited_out_and_retried() {
    let catalog = Arc::new(
        MockCatalog::new()
            .rate_limit_first(1, Duration::from_secs(2))
            .with_hit("only", "cat-1"),
    );
    let requester = Arc::new(RateLimitedRequester::new(RetryPolicy::default()));
    let resolver = CatalogResolver::new(
        catalog.clone(),
        requester,
        QueryCandidateBuilder::new(AliasTable::builtin()),
    );
    let chain = CandidateChain::from_free_text(["only"]);

    let start = tokio::time::Instant::now();
    let outcome = resolver.resolve_chain(&chain).await;
    let elapsed = start.elapsed();

    assert_eq!(catalog.search_count(), 2);
    assert!(elapsed >= Duration::from_secs(2), "waited only {:?}", elapsed);
    assert!(matches!(
        outcome,
        Outcome::Matched {
            candidate_index: 0,
            confidence: Confidence::Confident,
            ..
        }
    ));
}

#[tokio::test]
async fn test_built_chain_call_count_matches_hit_depth() {
    // Only the free-text candidate (index 3n+1 for one artist) hits
    let catalog = Arc::new(MockCatalog::new().with_hit("Artist Album Song (Live)", "ft"));
    let track = AggregatedTrack::new("Artist", "Album", "Song (Live)", 9);

    let outcome = resolver(catalog.clone()).resolve_one(&track).await;

    match outcome {
        Outcome::Matched {
            candidate_index,
            confidence,
            ..
        } => {
            assert_eq!(candidate_index, 4);
            assert_eq!(catalog.search_count(), candidate_index + 1);
            assert_eq!(confidence, Confidence::HighlyQuestionable);
        }
        other => panic!("expected match, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolve_all_merges_by_catalog_id() {
    let catalog = Arc::new(MockCatalog::new().with_fallback(|query| {
        // Both spellings of the song land on the same catalog entry
        if query.contains("Song") {
            vec!["same".to_string()]
        } else if query.contains("Other") {
            vec!["other".to_string()]
        } else {
            Vec::new()
        }
    }));
    let tracks = vec![
        AggregatedTrack::new("A", "X", "Song", 5),
        AggregatedTrack::new("B", "Y", "Other", 6),
        AggregatedTrack::new("A", "X", "Song!", 3),
        AggregatedTrack::new("C", "Z", "Nothing", 2),
    ];

    let report = resolver(catalog).with_concurrency(4).resolve_all(tracks).await;

    assert_eq!(report.merged, 1);
    assert_eq!(report.not_found.len(), 1);
    assert_eq!(report.not_found[0].title, "Nothing");
    assert!(report.failed.is_empty());

    let ranking = report.table.into_ranking(1000);
    let ids: Vec<(&str, u64)> = ranking
        .iter()
        .map(|t| (t.catalog_id.as_str(), t.scrobble_count))
        .collect();
    assert_eq!(ids, vec![("same", 8), ("other", 6)]);
}

#[tokio::test]
async fn test_resolve_all_isolates_failures() {
    let catalog = Arc::new(
        MockCatalog::new()
            .with_failing_query("album:\"X\" artist:\"Bad\" track:\"Broken\"")
            .with_fallback(|query| {
                if query.contains("Fine") {
                    vec!["fine".to_string()]
                } else {
                    Vec::new()
                }
            }),
    );
    let tracks = vec![
        AggregatedTrack::new("Bad", "X", "Broken", 10),
        AggregatedTrack::new("Good", "Y", "Fine", 1),
    ];

    let report = resolver(catalog).resolve_all(tracks).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.title, "Broken");
    assert_eq!(report.table.len(), 1);
    assert!(report.table.get("fine").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_resolve_all_respects_concurrency_limit() {
    let catalog = Arc::new(
        MockCatalog::new()
            .with_search_delay(Duration::from_millis(10))
            .with_fallback(|query| {
                if query.contains("track:\"Song") {
                    vec![format!("id-{}", query.len())]
                } else {
                    Vec::new()
                }
            }),
    );
    let tracks: Vec<AggregatedTrack> = (0..50)
        .map(|n| {
            AggregatedTrack::new(format!("Artist {}", n), "Album", format!("Song {}", n), 1)
        })
        .collect();

    let report = resolver(catalog.clone())
        .with_concurrency(4)
        .resolve_all(tracks)
        .await;

    assert!(report.failed.is_empty());
    assert!(report.not_found.is_empty());
    let peak = catalog.peak_in_flight();
    assert!(peak <= 4, "{} searches overlapped", peak);
    assert!(peak > 1, "searches never overlapped");
}

#[tokio::test(start_paused = true)]
async fn test_long_rate_limit_streak_still_resolves() {
    let catalog = Arc::new(
        MockCatalog::new()
            .rate_limit_first(12, Duration::from_secs(1))
            .with_hit("only", "cat-1"),
    );
    let chain = CandidateChain::from_free_text(["only"]);

    let outcome = resolver(catalog.clone()).resolve_chain(&chain).await;

    assert_eq!(catalog.search_count(), 13);
    assert!(matches!(outcome, Outcome::Matched { candidate_index: 0, .. }));
}
