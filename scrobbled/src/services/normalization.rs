//! Text normalization rules for search candidates
//!
//! Scrobbled metadata is noisy: remix and feature annotations in parentheses,
//! "- Single" suffixes, regional retitlings, several artists in one field.
//! The rules below are ordered tables consulted by the query builder. None of
//! them touch the network, so each is testable on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Which metadata field a text rule rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    Album,
    Name,
    Both,
}

impl FieldScope {
    fn covers(&self, field: FieldScope) -> bool {
        *self == FieldScope::Both || *self == field
    }
}

/// One regex-based removal applied during normalization
pub struct TextRule {
    pub description: &'static str,
    pub scope: FieldScope,
    pattern: Regex,
    /// Remove every match rather than only the first
    all: bool,
}

impl TextRule {
    fn new(description: &'static str, scope: FieldScope, pattern: &str, all: bool) -> Self {
        Self {
            description,
            scope,
            pattern: Regex::new(pattern).expect("static normalization pattern"),
            all,
        }
    }

    fn apply(&self, text: &str) -> String {
        if self.all {
            self.pattern.replace_all(text, "").into_owned()
        } else {
            self.pattern.replace(text, "").into_owned()
        }
    }
}

/// Ordered removal rules for album and track names
pub static TEXT_RULES: Lazy<Vec<TextRule>> = Lazy::new(|| {
    vec![
        // "Song (feat. X)", "Album (Deluxe)"
        TextRule::new("parenthetical suffix", FieldScope::Both, r" \(.+\)", true),
        // "Song [Remix]"
        TextRule::new("bracketed suffix", FieldScope::Both, r" \[.+\]", true),
        // "Song - Remastered 2011", "Album - Single"
        TextRule::new("dash suffix", FieldScope::Both, r" -.*", false),
        // "Album ll" sequel numbering
        TextRule::new("trailing ll", FieldScope::Album, r" ll$", false),
    ]
});

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w ]").expect("static punctuation pattern"));

static PUNCTUATED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w*[^\w ]\w*").expect("static token pattern"));

static ARTIST_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,&]").expect("static delimiter pattern"));

/// Album titles the catalog lists under a different name; exact match,
/// replaces normalization entirely
pub const ALBUM_RETITLINGS: &[(&str, &str)] = &[("DRIP SEASON 4EVER", "DS4EVER")];

/// Stage names mapped to the name the catalog credits
pub const ARTIST_ALIASES: &[(&str, &str)] = &[("Salva", "Young Thug")];

/// When a special case fires
#[derive(Debug, Clone, Copy)]
pub enum Condition {
    /// Normalized album equals the value
    AlbumIs(&'static str),
    /// First split artist and normalized name both equal the values
    PrimaryArtistAndName {
        artist: &'static str,
        name: &'static str,
    },
}

/// What a special case changes
#[derive(Debug, Clone, Copy)]
pub enum Rewrite {
    /// Drop the name from the first occurrence of the marker to the end
    TruncateNameAt(&'static str),
    /// Replace the first occurrence of each pattern in the name
    ReplaceInName(&'static [(&'static str, &'static str)]),
    /// Substitute the album outright
    SetAlbum(&'static str),
}

/// Hand-curated fix for one known artist/album/title combination
#[derive(Debug, Clone, Copy)]
pub struct SpecialCase {
    pub when: Condition,
    pub rewrite: Rewrite,
}

/// Applied after normalization, in order
pub const SPECIAL_CASES: &[SpecialCase] = &[
    SpecialCase {
        when: Condition::AlbumIs("TA13OO"),
        rewrite: Rewrite::TruncateNameAt(" l"),
    },
    SpecialCase {
        when: Condition::AlbumIs("Trilogy"),
        rewrite: Rewrite::ReplaceInName(&[("Part 1", "Pt. 1"), ("Part 2", "Pt. 2")]),
    },
    SpecialCase {
        when: Condition::PrimaryArtistAndName {
            artist: "YoungBoy Never Broke Again",
            name: "Untouchable",
        },
        rewrite: Rewrite::SetAlbum("AI Youngboy"),
    },
    SpecialCase {
        when: Condition::PrimaryArtistAndName {
            artist: "Juice WRLD",
            name: "Armed and Dangerous",
        },
        rewrite: Rewrite::SetAlbum("Goodbye & Good Riddance"),
    },
];

impl SpecialCase {
    fn matches(&self, primary_artist: &str, album: &str, name: &str) -> bool {
        match self.when {
            Condition::AlbumIs(expected) => album == expected,
            Condition::PrimaryArtistAndName { artist, name: expected } => {
                primary_artist == artist && name == expected
            }
        }
    }

    fn apply(&self, album: &mut String, name: &mut String) {
        match self.rewrite {
            Rewrite::TruncateNameAt(marker) => {
                if let Some(pos) = name.find(marker) {
                    name.truncate(pos);
                }
            }
            Rewrite::ReplaceInName(pairs) => {
                for (from, to) in pairs {
                    *name = name.replacen(from, to, 1);
                }
            }
            Rewrite::SetAlbum(value) => *album = value.to_string(),
        }
    }
}

/// Artist alias lookup: built-in table plus configured extras
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn builtin() -> Self {
        Self {
            aliases: ARTIST_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Built-in aliases, overridden or extended by `extra`
    pub fn with_extra(extra: &HashMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (from, to) in extra {
            table.aliases.insert(from.clone(), to.clone());
        }
        table
    }

    pub fn resolve<'a>(&'a self, artist: &'a str) -> &'a str {
        self.aliases.get(artist).map(String::as_str).unwrap_or(artist)
    }
}

fn apply_text_rules(text: &str, field: FieldScope) -> String {
    TEXT_RULES
        .iter()
        .filter(|rule| rule.scope.covers(field))
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Album with annotations stripped, or its known retitling
pub fn normalize_album(album: &str) -> String {
    if let Some((_, retitled)) = ALBUM_RETITLINGS.iter().find(|(from, _)| *from == album) {
        return retitled.to_string();
    }
    apply_text_rules(album, FieldScope::Album)
}

/// Track name with annotations stripped
pub fn normalize_name(name: &str) -> String {
    apply_text_rules(name, FieldScope::Name)
}

/// Remove every character that is neither a word character nor a space
pub fn strip_punctuation(text: &str) -> String {
    PUNCTUATION.replace_all(text, "").into_owned()
}

/// Remove whole tokens that contain punctuation ("don't stop" -> " stop")
pub fn strip_punctuated_tokens(text: &str) -> String {
    PUNCTUATED_TOKEN.replace_all(text, "").into_owned()
}

/// Split a combined artist field into individual, aliased names
///
/// Always yields at least one entry (possibly empty).
pub fn split_artists(artist: &str, aliases: &AliasTable) -> Vec<String> {
    ARTIST_DELIMITER
        .split(artist)
        .map(|part| aliases.resolve(part.trim()).to_string())
        .collect()
}

/// Apply every matching special case to the normalized album and name
pub fn apply_special_cases(primary_artist: &str, album: &mut String, name: &mut String) {
    for case in SPECIAL_CASES {
        if case.matches(primary_artist, album, name) {
            case.apply(album, name);
        }
    }
}
