//! Search candidate generation
//!
//! For one aggregated track, builds the ordered list of catalog queries the
//! resolver tries, most specific first:
//!
//! 1. the original artist/album/name as scrobbled
//! 2. per split artist, normalized album and name
//! 3. per split artist, punctuation removed
//! 4. per split artist, punctuated tokens removed
//! 5. free text of the original fields
//! 6. original artist with normalized name, then with punctuated tokens removed

use crate::services::normalization::{
    apply_special_cases, normalize_album, normalize_name, split_artists,
    strip_punctuated_tokens, strip_punctuation, AliasTable,
};
use scrobbled_common::AggregatedTrack;
use std::fmt;

/// Field-filtered catalog query; absent or empty fields are left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub name: Option<String>,
}

/// One attempted search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCandidate {
    FreeText(String),
    Structured(StructuredQuery),
}

impl QueryCandidate {
    pub fn structured(artist: &str, album: Option<&str>, name: &str) -> Self {
        QueryCandidate::Structured(StructuredQuery {
            artist: Some(artist.to_string()),
            album: album.map(str::to_string),
            name: Some(name.to_string()),
        })
    }

    /// Query string in the catalog's field-filter syntax
    pub fn to_query_string(&self) -> String {
        match self {
            QueryCandidate::FreeText(text) => text.trim().to_string(),
            QueryCandidate::Structured(query) => [
                ("album", &query.album),
                ("artist", &query.artist),
                ("track", &query.name),
            ]
            .iter()
            .filter_map(|(field, value)| {
                let value = value.as_deref()?.replace('"', "");
                if value.trim().is_empty() {
                    None
                } else {
                    Some(format!("{}:\"{}\"", field, value))
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        }
    }
}

impl fmt::Display for QueryCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// Ordered candidates for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateChain {
    pub candidates: Vec<QueryCandidate>,
    /// Number of individual artists the artist field split into
    pub artist_count: usize,
}

impl CandidateChain {
    /// Chain of free-text queries, one artist
    pub fn from_free_text<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: queries
                .into_iter()
                .map(|q| QueryCandidate::FreeText(q.into()))
                .collect(),
            artist_count: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Builds [`CandidateChain`]s; never fails
#[derive(Debug, Clone, Default)]
pub struct QueryCandidateBuilder {
    aliases: AliasTable,
}

impl QueryCandidateBuilder {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn build(&self, track: &AggregatedTrack) -> CandidateChain {
        let artists = split_artists(&track.artist, &self.aliases);
        let primary = artists.first().map(String::as_str).unwrap_or("");

        let mut album = normalize_album(&track.album);
        let mut name = normalize_name(&track.title);
        apply_special_cases(primary, &mut album, &mut name);

        let depunct_album = strip_punctuation(&album);
        let depunct_name = strip_punctuation(&name);
        let detoken_album = strip_punctuated_tokens(&album);
        let detoken_name = strip_punctuated_tokens(&name);

        let mut candidates = Vec::with_capacity(3 * artists.len() + 4);

        candidates.push(QueryCandidate::structured(
            &track.artist,
            Some(&track.album),
            &track.title,
        ));
        candidates.extend(
            artists
                .iter()
                .map(|artist| QueryCandidate::structured(artist, Some(&album), &name)),
        );
        candidates.extend(artists.iter().map(|artist| {
            QueryCandidate::structured(artist, Some(&depunct_album), &depunct_name)
        }));
        candidates.extend(artists.iter().map(|artist| {
            QueryCandidate::structured(artist, Some(&detoken_album), &detoken_name)
        }));
        candidates.push(QueryCandidate::FreeText(format!(
            "{} {} {}",
            track.artist, track.album, track.title
        )));
        candidates.push(QueryCandidate::structured(&track.artist, None, &name));
        candidates.push(QueryCandidate::structured(&track.artist, None, &detoken_name));

        CandidateChain {
            candidates,
            artist_count: artists.len(),
        }
    }
}
