//! Unified error type for the stock scraper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Stock API error (status={status}): {message}")]
    Fetch { status: u16, message: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for statuses that mean the session cookie was rejected.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Error::Fetch { status: 401 | 403, .. })
    }
}
