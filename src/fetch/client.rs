//! HTTP client for fetching resource bytes.
//!
//! This module provides the [`Fetcher`] trait, the boundary between the
//! assembler and the network, and its reqwest-backed production
//! implementation [`HttpClient`]. Every failure mode is converted into a
//! typed [`FetchError`] value; nothing escapes the `fetch` boundary as a
//! panic or untyped error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::error::{FetchError, FetchResult};

/// Default connect timeout in seconds.
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default overall request timeout in seconds.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Retrieves the byte content of a single resource.
///
/// Calls are independent and share no mutable state, so implementations can
/// be driven concurrently from one task per resource.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the resource at `source`, returning its bytes or a typed
    /// failure. Never panics past this boundary.
    async fn fetch(&self, source: &str) -> FetchResult;
}

/// Reqwest-backed [`Fetcher`] with connection pooling.
///
/// Create once and reuse across an assembly; `Clone` shares the underlying
/// connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default timeouts (30s connect, 5min request).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values in seconds.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(connect_timeout_secs: u64, request_timeout_secs: u64) -> Self {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(request_timeout_secs))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, source: &str) -> FetchResult {
        if Url::parse(source).is_err() {
            return Err(FetchError::invalid_url(source));
        }

        let response = self.client.get(source).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(source)
            } else {
                FetchError::network(source, e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(source));
        }
        if !status.is_success() {
            return Err(FetchError::http_status(source, status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(source)
            } else {
                FetchError::network(source, e)
            }
        })?;

        debug!(url = %source, bytes = bytes.len(), "fetched resource");
        Ok(bytes.to_vec())
    }
}
