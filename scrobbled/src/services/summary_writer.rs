//! Human-readable run summary
//!
//! Fixed-width table of the published ranking, followed by the matches that
//! were flagged as questionable and the tracks that could not be found. Not
//! meant to be parsed.

use crate::services::catalog_resolver::ResolutionReport;
use scrobbled_common::ResolvedTrack;
use std::fmt::Write as _;
use std::path::Path;

/// Width of the artist, album and name columns
pub const COLUMN_WIDTH: usize = 26;

/// Truncate or pad `text` to exactly `width` characters
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        let mut out = text.to_string();
        out.extend(std::iter::repeat(' ').take(width - count));
        out
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn separator() -> String {
    format!(
        "+{}+{}+{}+{}+{}+\n",
        "-".repeat(6),
        "-".repeat(COLUMN_WIDTH + 2),
        "-".repeat(COLUMN_WIDTH + 2),
        "-".repeat(COLUMN_WIDTH + 2),
        "-".repeat(11)
    )
}

fn row(rank: &str, artist: &str, album: &str, name: &str, count: &str) -> String {
    format!(
        "| {:>4} | {} | {} | {} | {:>9} |\n",
        rank,
        fit(artist, COLUMN_WIDTH),
        fit(album, COLUMN_WIDTH),
        fit(name, COLUMN_WIDTH),
        count
    )
}

/// Render the ranking table and the flagged/not-found sections
pub fn render_summary(ranking: &[ResolvedTrack], report: &ResolutionReport) -> String {
    let mut out = String::new();

    out.push_str(&separator());
    out.push_str(&row("Rank", "Artist", "Album", "Name", "Scrobbles"));
    out.push_str(&separator());
    for (i, track) in ranking.iter().enumerate() {
        out.push_str(&row(
            &(i + 1).to_string(),
            &track.source.artist,
            &track.source.album,
            &track.source.title,
            &track.scrobble_count.to_string(),
        ));
    }
    out.push_str(&separator());

    if !report.questionable.is_empty() {
        let _ = writeln!(out, "\nQuestionable matches ({})", report.questionable.len());
        for flagged in &report.questionable {
            let _ = writeln!(
                out,
                "  [{}] {} - {} - {} => {} (query: {})",
                flagged.confidence.label(),
                flagged.track.artist,
                flagged.track.album,
                flagged.track.title,
                flagged.catalog_id,
                flagged.query
            );
        }
    }

    if !report.not_found.is_empty() {
        let _ = writeln!(out, "\nNot found ({})", report.not_found.len());
        for track in &report.not_found {
            let _ = writeln!(
                out,
                "  {} - {} - {} ({} scrobbles)",
                track.artist, track.album, track.title, track.scrobble_count
            );
        }
    }

    if !report.failed.is_empty() {
        let _ = writeln!(out, "\nFailed ({})", report.failed.len());
        for (track, error) in &report.failed {
            let _ = writeln!(
                out,
                "  {} - {} - {}: {}",
                track.artist, track.album, track.title, error
            );
        }
    }

    out
}

/// Write the summary to `path`, creating parent directories as needed
pub fn write_summary(
    path: &Path,
    ranking: &[ResolvedTrack],
    report: &ResolutionReport,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_summary(ranking, report))
}
