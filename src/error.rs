//! Error types for upstream access, storage and payload decoding.
//!
//! Squad-rule violations are not errors; see [`crate::squad::Rejection`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("network failure: {0}")]
    Network(String),

    #[error("upstream returned http {status} for {url}")]
    Upstream { status: u16, url: String },

    /// Bad credentials and expired sessions are reported identically.
    #[error("invalid credentials or session expired")]
    Auth,

    #[error("incomplete upstream data: missing {0}")]
    DataIncomplete(&'static str),

    #[error("invalid upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Error::Upstream {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        Error::Network(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
