//! Fetching of bundles, CRLs and OCSP responses.
//!
//! [`Transport`] is the seam to the network; [`HttpTransport`] is the production
//! implementation. [`Fetcher`] wraps a transport and records every outcome in the
//! [`UriCache`](crate::uri_cache::UriCache), returning a body only for 2xx responses.

use crate::locator::Locator;
use crate::prelude::{debug, warn};
use crate::uri_cache::{next_update_from_cache_control, UriCache, UriCacheEntry};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use url::Url;

pub mod error;
#[cfg(feature = "http")]
pub mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

/// A response as seen by the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub protocol: String,
    /// Reason phrase.
    pub reason: String,
    /// `Cache-Control` header value.
    pub cache_control: Option<String>,
    /// Body bytes.
    pub body: Vec<u8>,
    /// Time to complete the request.
    pub elapsed: Duration,
}

impl Response {
    /// Returns `true` for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by discovery, the CRL cache and the OCSP client.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Issues a `GET`.
    async fn get(&self, uri: &Url) -> Result<Response, TransportError>;

    /// Issues a `POST` of `body` with the given content type.
    async fn post(
        &self,
        uri: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Response, TransportError>;
}

/// A transport bound to the URI cache.
#[derive(Debug, Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    uri_cache: Arc<UriCache>,
}

impl Fetcher {
    /// Creates a fetcher recording into `uri_cache`.
    pub fn new(transport: Arc<dyn Transport>, uri_cache: Arc<UriCache>) -> Self {
        Self {
            transport,
            uri_cache,
        }
    }

    /// The URI cache outcomes are recorded in.
    pub fn uri_cache(&self) -> &Arc<UriCache> {
        &self.uri_cache
    }

    /// `GET`s `locator`. Returns `Ok(None)` for a non-2xx response.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] after recording it as a failed URI-cache entry.
    pub async fn get(&self, locator: &Locator) -> Result<Option<Vec<u8>>, TransportError> {
        let started = Instant::now();
        let result = self.transport.get(locator.url()).await;
        self.complete(locator, result, started)
    }

    /// `POST`s `body` to `locator`. Returns `Ok(None)` for a non-2xx response.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] after recording it as a failed URI-cache entry.
    pub async fn post(
        &self,
        locator: &Locator,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let started = Instant::now();
        let result = self
            .transport
            .post(locator.url(), content_type, body)
            .await;
        self.complete(locator, result, started)
    }

    fn complete(
        &self,
        locator: &Locator,
        result: Result<Response, TransportError>,
        started: Instant,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed; uri={}, error={}", locator, e);
                self.uri_cache
                    .record(UriCacheEntry::failure(locator.as_str(), &e, started.elapsed()));
                return Err(e);
            }
        };

        let now = OffsetDateTime::now_utc();
        debug!(
            "Fetched locator; uri={}, status={}, bytes={}, elapsed_ms={}",
            locator,
            response.status,
            response.body.len(),
            response.elapsed.as_millis()
        );
        self.uri_cache.record(UriCacheEntry {
            uri: locator.as_str().to_string(),
            status: response.status,
            protocol: response.protocol.clone(),
            reason: response.reason.clone(),
            bytes: response.body.len(),
            response_time: response.elapsed,
            last_checked: now,
            next_update: next_update_from_cache_control(response.cache_control.as_deref(), now),
        });

        if response.is_success() {
            Ok(Some(response.body))
        } else {
            Ok(None)
        }
    }
}
