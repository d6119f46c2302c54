//! Last.fm API client
//!
//! Reads one page of `user.getrecenttracks`. Pagination and fan-out live in
//! [`crate::services::history_fetcher`].

use crate::clients::{HistoryPage, HistorySource};
use crate::services::requester::RetryAfter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use scrobbled_common::PlayEvent;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = concat!("scrobbled/", env!("CARGO_PKG_VERSION"));

/// Last.fm error code for "Rate Limit Exceeded"
const LASTFM_RATE_LIMIT_CODE: u32 = 29;

/// Last.fm gives no retry interval, so back off for a fixed period
const LASTFM_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Last.fm client errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Last.fm error {code}: {message}")]
    ServiceError { code: u32, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl RetryAfter for HistoryError {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            HistoryError::RateLimited => Some(LASTFM_RATE_LIMIT_BACKOFF),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RecentTracksEnvelope {
    recenttracks: RecentTracks,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany<LfmTrack>,
    #[serde(rename = "@attr")]
    attr: PageAttr,
}

/// Single-item pages come back as an object instead of an array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageAttr {
    #[serde(rename = "totalPages")]
    total_pages: NumberOrString,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u32),
    Text(String),
}

impl NumberOrString {
    fn as_u32(&self) -> Result<u32, HistoryError> {
        match self {
            NumberOrString::Number(n) => Ok(*n),
            NumberOrString::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| HistoryError::ParseError(format!("Invalid totalPages: {:?}", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LfmTrack {
    artist: TextField,
    #[serde(default)]
    album: TextField,
    name: String,
    date: Option<LfmDate>,
}

#[derive(Debug, Default, Deserialize)]
struct TextField {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct LfmDate {
    uts: NumberOrString,
}

impl LfmTrack {
    fn into_event(self) -> PlayEvent {
        let played_at = self
            .date
            .and_then(|d| d.uts.as_u32().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(i64::from(secs), 0));

        PlayEvent {
            artist: self.artist.text,
            album: self.album.text,
            title: self.name,
            played_at,
        }
    }
}

/// Parse a `user.getrecenttracks` response body
pub(crate) fn parse_recent_tracks(body: &str) -> Result<HistoryPage, HistoryError> {
    if let Ok(err) = serde_json::from_str::<ErrorEnvelope>(body) {
        if err.error == LASTFM_RATE_LIMIT_CODE {
            return Err(HistoryError::RateLimited);
        }
        return Err(HistoryError::ServiceError {
            code: err.error,
            message: err.message,
        });
    }

    let envelope: RecentTracksEnvelope =
        serde_json::from_str(body).map_err(|e| HistoryError::ParseError(e.to_string()))?;

    let total_pages = envelope.recenttracks.attr.total_pages.as_u32()?;
    let events = envelope
        .recenttracks
        .track
        .into_vec()
        .into_iter()
        // The "now playing" entry has no date and is not a scrobble yet
        .filter(|track| track.date.is_some())
        .map(LfmTrack::into_event)
        .collect();

    Ok(HistoryPage {
        events,
        total_pages,
    })
}

/// Last.fm API client for one user's scrobbles
pub struct LastFmClient {
    http_client: Client,
    base_url: String,
    user: String,
    api_key: String,
    page_size: u32,
}

impl LastFmClient {
    pub fn new(
        user: impl Into<String>,
        api_key: impl Into<String>,
        page_size: u32,
    ) -> Result<Self, HistoryError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HistoryError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: LASTFM_API_URL.to_string(),
            user: user.into(),
            api_key: api_key.into(),
            page_size,
        })
    }
}

#[async_trait]
impl HistorySource for LastFmClient {
    async fn fetch_page(&self, page: u32, to: i64) -> Result<HistoryPage, HistoryError> {
        let limit = self.page_size.to_string();
        let to = to.to_string();
        let page_str = page.to_string();
        let params = [
            ("method", "user.getrecenttracks"),
            ("user", self.user.as_str()),
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
            ("to", to.as_str()),
            ("page", page_str.as_str()),
            ("format", "json"),
        ];

        tracing::debug!(page, "Querying Last.fm recent tracks");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| HistoryError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HistoryError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| HistoryError::NetworkError(e.to_string()))?;

        // Last.fm reports most failures as a JSON error envelope, sometimes
        // with a 4xx status, sometimes with 200
        match parse_recent_tracks(&body) {
            Ok(page) => Ok(page),
            Err(HistoryError::ParseError(_)) if !status.is_success() => {
                Err(HistoryError::ApiError(status.as_u16(), body))
            }
            Err(e) => Err(e),
        }
    }
}
