//! HTTP data source backed by [`reqwest`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::DataSource;
use crate::error::FetchError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches feed bodies over HTTPS.
///
/// One client is shared by every feed so connections to the same host are
/// pooled.
pub struct HttpSource {
    client: reqwest::Client,
    label: String,
}

impl HttpSource {
    /// Build a source whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            label: "https".into(),
        })
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "non-success response");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;
        Ok(body.to_vec())
    }
}
