//! Error types for the fetch layer.

use std::error::Error as StdError;
use thiserror::Error;

/// Errors produced while fetching a locator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request to {uri} timed out")]
    Timeout {
        /// The requested URI.
        uri: String,
    },

    /// The request failed before a response was received.
    #[error("request to {uri} failed: {source}")]
    Request {
        /// The requested URI.
        uri: String,
        /// Underlying client error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The response body exceeded the configured limit.
    #[error("response from {uri} exceeds {limit} bytes")]
    BodyTooLarge {
        /// The requested URI.
        uri: String,
        /// The configured limit.
        limit: usize,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// No transport is available for the locator's scheme.
    #[error("unsupported locator scheme: {scheme}")]
    UnsupportedScheme {
        /// The scheme of the locator.
        scheme: String,
    },
}
