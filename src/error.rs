//! Error types for the scraping pipeline and its configuration.
//!
//! Errors are scoped the same way recovery is: a [`SourceError`] never
//! escapes the aggregator (it is turned into an empty item set plus a
//! report entry), while a [`ConfigError`] stops the program before any
//! source is fetched.

use thiserror::Error;

/// Failure while fetching or reading a single source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection, TLS, or body decoding failure.
    #[error("transport error for {url}: {msg}")]
    Transport { url: String, msg: String },

    /// The server answered with a non-success status code.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The configured item selector could not be parsed.
    #[error("invalid item selector {selector:?}: {msg}")]
    Selector { selector: String, msg: String },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl SourceError {
    /// Classify a `reqwest` error for `url`.
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            SourceError::Transport {
                url: url.to_string(),
                msg: e.to_string(),
            }
        }
    }
}

/// Failure while loading or validating the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
