//! Error types for the feed renderer

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or rendering a feed
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to fetch the feed document
    #[error("Failed to load feed: {0}")]
    LoadError(String),

    /// Network error (connection, timeout, non-success status)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The feed body was not valid JSON
    #[error("Failed to parse feed: {0}")]
    ParseError(String),

    /// The page or card template does not satisfy the markup contract
    #[error("Template error: {0}")]
    TemplateError(String),

    /// A URL could not be parsed or has no host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A single feed item could not be turned into a card
    #[error("Item {index}: {reason}")]
    ItemError { index: usize, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}
