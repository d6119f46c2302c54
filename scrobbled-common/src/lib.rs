//! # scrobbled common library
//!
//! Shared code for the scrobbled workspace:
//! - Domain models (play events, aggregated and resolved tracks)
//! - Error type
//! - TOML configuration loading and validation

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{AggregatedTrack, Confidence, PlayEvent, PlaylistSpec, ResolvedTrack, TrackKey};
