//! # scrobbled
//!
//! Builds a Spotify playlist of a Last.fm user's most-played tracks.
//!
//! The scrobble history is aggregated by exact `(artist, album, title)`,
//! filtered through a denylist, resolved to catalog IDs through a chain of
//! progressively looser search queries, merged by catalog ID and published
//! as a playlist of at most 1000 tracks.

pub mod auth;
pub mod clients;
pub mod services;
pub mod workflow;

pub use workflow::{run, run_with, RunSummary};
