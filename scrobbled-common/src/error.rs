//! Common error types for scrobbled

use thiserror::Error;

/// Common result type for scrobbled operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised before any network activity starts
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be located or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for the expected schema
    #[error("Malformed configuration file: {0}")]
    TomlParse(#[from] toml::de::Error),
}
