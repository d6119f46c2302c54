//! Spotify Web API client
//!
//! Covers the three calls the pipeline needs: track search, playlist
//! creation and batch track append. Rate-limit responses (HTTP 429) are
//! surfaced as [`CatalogError::RateLimited`] carrying the `Retry-After`
//! interval so the requester can wait them out.

use crate::clients::CatalogApi;
use crate::services::requester::RetryAfter;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use scrobbled_common::PlaylistSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("scrobbled/", env!("CARGO_PKG_VERSION"));

/// Used when a 429 arrives without a usable Retry-After header
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Spotify client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Access token rejected")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RetryAfter for CatalogError {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            CatalogError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchTracks {
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackItem {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Debug, Serialize)]
struct AddTracksRequest<'a> {
    uris: &'a [String],
}

/// Seconds from a `Retry-After` header, falling back to one second
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Duration {
    let secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

/// Catalog IDs of the search hits, best first
pub(crate) fn parse_search_ids(body: &str) -> Result<Vec<String>, CatalogError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;
    Ok(parsed.tracks.items.into_iter().map(|t| t.id).collect())
}

/// Spotify Web API client authenticated with a pre-issued access token
pub struct SpotifyClient {
    http_client: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_base_url(access_token, SPOTIFY_API_URL)
    }

    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Map non-success statuses onto [`CatalogError`]
    async fn check(response: Response) -> Result<Response, CatalogError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn search_tracks(&self, query: &str) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/search", self.base_url);

        tracing::trace!(query = %query, "Searching Spotify");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let body = Self::check(response)
            .await?
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        parse_search_ids(&body)
    }

    async fn create_playlist(&self, spec: &PlaylistSpec) -> Result<String, CatalogError> {
        let url = format!("{}/me/playlists", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&CreatePlaylistRequest {
                name: &spec.name,
                description: &spec.description,
                public: spec.public,
            })
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let playlist: PlaylistResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        tracing::info!(playlist_id = %playlist.id, name = %spec.name, "Created Spotify playlist");

        Ok(playlist.id)
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), CatalogError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&AddTracksRequest { uris: track_uris })
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_client_creation() {
        let client = SpotifyClient::with_base_url("token", "http://localhost:9/v1/");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), Duration::from_secs(1));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Duration::from_secs(7));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_search_ids() {
        let body = r#"{"tracks": {"href": "x", "items": [
            {"id": "4uLU6hMCjMI75M1A2tKUQC", "name": "Never Gonna Give You Up"},
            {"id": "second", "name": "Other"}
        ], "total": 2}}"#;
        assert_eq!(
            parse_search_ids(body).unwrap(),
            vec!["4uLU6hMCjMI75M1A2tKUQC".to_string(), "second".to_string()]
        );

        let empty = r#"{"tracks": {"items": []}}"#;
        assert!(parse_search_ids(empty).unwrap().is_empty());

        assert!(matches!(parse_search_ids("{}"), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        let limited = CatalogError::RateLimited {
            retry_after: Duration::from_secs(2),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(CatalogError::Unauthorized.retry_after(), None);
        assert_eq!(CatalogError::Api(500, String::new()).retry_after(), None);
    }
}
