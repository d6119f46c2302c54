//! Configuration loading and validation
//!
//! All credentials and tunables come from a single TOML file read once at
//! startup. Any problem with it is fatal before network activity begins.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SCROBBLED_CONFIG` environment variable
//! 3. `./scrobbled.toml` in the working directory
//! 4. `<config_dir>/scrobbled/config.toml` (OS-dependent)

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SCROBBLED_CONFIG";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "scrobbled.toml";

/// Upper bound on playlist length
pub const MAX_PLAYLIST_SIZE: usize = 1000;

/// Catalog API limit for one batch-add call
pub const MAX_BATCH_SIZE: usize = 100;

/// Upper bound on simultaneous in-flight track resolutions
pub const MAX_CONCURRENCY: usize = 25;

/// Last.fm `limit` parameter maximum
pub const MAX_PAGE_SIZE: u32 = 200;

/// Complete configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub lastfm: LastFmConfig,
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    /// Extra artist aliases (`"Stage Name" = "Primary Name"`)
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

/// Last.fm credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LastFmConfig {
    pub user: String,
    pub api_key: String,
}

/// Spotify credentials
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    /// Pre-issued access token; may be empty when only running `authorize`
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

/// Target playlist metadata and publication limits
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistConfig {
    #[serde(default = "default_playlist_name")]
    pub name: String,
    #[serde(default = "default_playlist_description")]
    pub description: String,
    #[serde(default = "default_true")]
    pub public: bool,
    /// Number of top-ranked tracks published
    #[serde(default = "default_playlist_size")]
    pub size: usize,
    /// Track IDs per batch-add call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            name: default_playlist_name(),
            description: default_playlist_description(),
            public: true,
            size: default_playlist_size(),
            batch_size: default_batch_size(),
        }
    }
}

/// Catalog resolution tunables
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Simultaneous in-flight track resolutions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Candidate index >= factor * artist_count + 1 is questionable
    #[serde(default = "default_questionable_factor")]
    pub questionable_factor: usize,
    /// Candidate index >= factor * artist_count + 1 is highly questionable
    #[serde(default = "default_highly_questionable_factor")]
    pub highly_questionable_factor: usize,
    /// Emit a progress line every N resolved tracks
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            questionable_factor: default_questionable_factor(),
            highly_questionable_factor: default_highly_questionable_factor(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Retry policy for outbound API calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Added on top of the server's Retry-After interval
    #[serde(default = "default_buffer_secs")]
    pub buffer_secs: u64,
    /// Optional cap on rate-limit waits per call; unset waits indefinitely
    #[serde(default)]
    pub max_rate_limit_retries: Option<u32>,
    /// Optional proactive pacing; 0 disables it
    #[serde(default)]
    pub requests_per_second: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            buffer_secs: default_buffer_secs(),
            max_rate_limit_retries: None,
            requests_per_second: 0,
        }
    }
}

/// History fetch settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Output artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_summary_path")]
    pub summary_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            summary_path: default_summary_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Additional denylist entries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub deny: Vec<DenyEntry>,
}

/// One denylist entry; absent fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DenyEntry {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub name: Option<String>,
}

fn default_redirect_uri() -> String {
    "https://example.com/callback".to_string()
}

fn default_playlist_name() -> String {
    "Scrobbled".to_string()
}

fn default_playlist_description() -> String {
    "1000 most listened to tracks".to_string()
}

fn default_true() -> bool {
    true
}

fn default_playlist_size() -> usize {
    MAX_PLAYLIST_SIZE
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_concurrency() -> usize {
    MAX_CONCURRENCY
}

fn default_questionable_factor() -> usize {
    2
}

fn default_highly_questionable_factor() -> usize {
    3
}

fn default_progress_interval() -> usize {
    50
}

fn default_buffer_secs() -> u64 {
    1
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("tracks.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        require_non_empty("lastfm.user", &self.lastfm.user)?;
        require_non_empty("lastfm.api_key", &self.lastfm.api_key)?;
        require_non_empty("spotify.client_id", &self.spotify.client_id)?;
        require_non_empty("playlist.name", &self.playlist.name)?;

        if self.playlist.size == 0 || self.playlist.size > MAX_PLAYLIST_SIZE {
            return Err(Error::Config(format!(
                "playlist.size must be between 1 and {}, got {}",
                MAX_PLAYLIST_SIZE, self.playlist.size
            )));
        }
        if self.playlist.batch_size == 0 || self.playlist.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "playlist.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.playlist.batch_size
            )));
        }
        if self.resolver.concurrency == 0 || self.resolver.concurrency > MAX_CONCURRENCY {
            return Err(Error::Config(format!(
                "resolver.concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.resolver.concurrency
            )));
        }
        if self.resolver.questionable_factor >= self.resolver.highly_questionable_factor {
            return Err(Error::Config(format!(
                "resolver.questionable_factor ({}) must be below highly_questionable_factor ({})",
                self.resolver.questionable_factor, self.resolver.highly_questionable_factor
            )));
        }
        if self.resolver.progress_interval == 0 {
            return Err(Error::Config(
                "resolver.progress_interval must be at least 1".to_string(),
            ));
        }
        if self.history.page_size == 0 || self.history.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "history.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.history.page_size
            )));
        }
        Ok(())
    }

    /// The pipeline needs a Spotify token; `authorize` does not
    pub fn require_access_token(&self) -> Result<&str> {
        require_non_empty("spotify.access_token", &self.spotify.access_token)?;
        Ok(&self.spotify.access_token)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Locates the configuration file following the priority order above
pub struct ConfigResolver {
    cli_arg: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    /// Resolve the config path, failing when no candidate exists
    pub fn resolve(&self) -> Result<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return existing(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return existing(PathBuf::from(path));
            }
        }

        // Priority 3: Working directory
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }

        // Priority 4: OS config directory
        if let Some(path) = user_config_path() {
            if path.exists() {
                return Ok(path);
            }
            debug!(path = %path.display(), "No user config file");
        }

        Err(Error::Config(format!(
            "No config file found (pass --config, set {}, or create {})",
            CONFIG_ENV_VAR, LOCAL_CONFIG_FILE
        )))
    }
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

/// `<config_dir>/scrobbled/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scrobbled").join("config.toml"))
}
