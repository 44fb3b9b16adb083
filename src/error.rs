//! Unified error type.

use thiserror::Error;

/// The error type returned by percolate's fallible operations.
///
/// Application-level failures (404, 400, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup and infrastructure failures: reading configuration, initialising a
/// filter, binding a port.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unknown charset `{0}`")]
    UnknownCharset(String),

    #[error("charset `{0}` cannot encode responses")]
    UnsupportedCharset(String),

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("invalid url pattern `{0}`")]
    InvalidPattern(String),
}
