//! One-time Spotify authorization URL
//!
//! The pipeline itself runs on a pre-issued access token. `scrobbled
//! authorize` prints the implicit-grant URL; after approving in the browser
//! the token is read from the redirect fragment and pasted into the config.

use anyhow::{Context, Result};
use reqwest::Url;

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Scope needed to create and fill a public playlist
pub const PLAYLIST_SCOPE: &str = "playlist-modify-public";

pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> Result<Url> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("response_type", "token"),
            ("redirect_uri", redirect_uri),
            ("scope", PLAYLIST_SCOPE),
            ("state", state),
            ("show_dialog", "true"),
        ],
    )
    .context("Failed to build authorization URL")
}
