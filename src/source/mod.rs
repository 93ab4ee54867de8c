//! Data source abstraction layer.
//!
//! This module defines the two seams between the polling cache and the
//! outside world:
//!
//! * [`DataSource`] performs the HTTP GET and hands back the raw body.
//! * [`FeedPayload`] turns that body into a typed record.
//!
//! Concrete record types live in one sub-module per upstream API
//! ([`coingecko`], [`alternative`], [`binance`], [`mempool`]).
//!
//! ## For contributors — adding a new feed
//!
//! 1. Add a variant to [`FeedId`] and a default descriptor in
//!    [`descriptor`].
//! 2. Define the record struct in the module of its API (or a new module)
//!    and implement [`FeedPayload`] for it.
//! 3. Add a `FeedCache<YourRecord>` field to [`crate::feeds::Feeds`].
//!
//! The cache, scheduling and change notifications are all feed-agnostic.

pub mod alternative;
pub mod binance;
pub mod coingecko;
pub mod descriptor;
pub mod http;
pub mod mempool;

pub use alternative::FearGreed;
pub use binance::LongShortRatio;
pub use coingecko::{HistoricalPrice, SpotPrice};
pub use descriptor::{FeedDescriptor, FeedId, UrlParams};
pub use http::HttpSource;
pub use mempool::{DifficultyAdjustment, MiningStats};

use async_trait::async_trait;

use crate::error::FetchError;

/// Something that can GET a URL and return the body.
///
/// The cache spawns fetches onto the runtime, so implementations must be
/// `Send + Sync`.  Tests substitute a counting in-memory source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    /// Fetch `url` and return the response body.
    ///
    /// Implementations classify failures themselves: transport problems are
    /// [`FetchError::NetworkUnreachable`], non-2xx responses are
    /// [`FetchError::HttpStatus`].
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// A record that can be decoded from a feed's response body.
pub trait FeedPayload: Sized + Send + Sync + 'static {
    /// Decode a response body.  Any shape mismatch is a
    /// [`FetchError::Decode`], never a panic.
    fn decode(body: &[u8]) -> Result<Self, FetchError>;
}

/// Parse a decimal that an API ships as a JSON string (Binance and
/// Alternative.me both do this).
pub(crate) fn parse_decimal<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, FetchError> {
    raw.trim()
        .parse()
        .map_err(|_| FetchError::Decode(format!("{field}: not a number: {raw:?}")))
}
