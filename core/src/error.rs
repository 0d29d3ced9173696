//! Error types for the character API client and favorites storage.
//!
//! # Design
//! `FetchError` is `Clone` so the repository can keep the failure inside
//! `LoadState::Error` and hand the same value to every observer. Underlying
//! library errors are flattened into strings for that reason.
//! `StorageError` keeps its sources because callers never clone it.

use std::path::PathBuf;

/// Errors produced while fetching and accumulating character pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The starting URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server answered 200 with an empty body.
    #[error("response contained no data")]
    NoData,

    /// The body was not a valid page envelope. `page` is 1-based.
    #[error("decoding failed on page {page}: {detail}")]
    Decode { page: usize, detail: String },

    /// The cursor chain was longer than the configured cap.
    #[error("pagination exceeded {limit} pages")]
    TooManyPages { limit: usize },
}

/// Errors raised by a favorites store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while building a repository from a `Config`.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
