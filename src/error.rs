//! Fetch error classification.
//!
//! Every failure the polling cache can observe falls into one of three
//! buckets.  None of them is fatal: the cache keeps serving the last value
//! that decoded successfully and attaches the error next to it.

use thiserror::Error;

/// Why a single fetch of a feed failed.
///
/// `Clone` because one failed fetch is handed to every caller that joined
/// it, and a copy is kept on the cache entry for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, or the body could not be read.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The body arrived but did not match the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short label for the status bar.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkUnreachable(_) => "network",
            FetchError::HttpStatus(_) => "http",
            FetchError::Decode(_) => "decode",
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
