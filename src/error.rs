//! Error type for cache manager operations.

use crate::bundle::BundleError;
use crate::cache::CacheError;
use crate::cert::error::CertificateError;
use crate::config::ConfigError;
use crate::crl_cache::CrlError;
use crate::ocsp::OcspError;
use crate::transport::TransportError;
use crate::validator::PathValidationError;
use thiserror::Error;

/// Errors produced by the [`CacheManager`](crate::manager::CacheManager) and its builder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cache lookup failed, or the anchor cannot root a cache.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A certificate or identifier could not be decoded.
    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),

    /// A bundle could not be encoded or decoded.
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// A CRL could not be obtained.
    #[error(transparent)]
    Crl(#[from] CrlError),

    /// A network fetch failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An OCSP exchange failed.
    #[error(transparent)]
    Ocsp(#[from] OcspError),

    /// A certification path did not validate.
    #[error(transparent)]
    PathValidation(#[from] PathValidationError),

    /// The certificate publishes no HTTP OCSP responder.
    #[error("no OCSP responder for {subject}")]
    NoOcspResponder {
        /// Subject of the certificate.
        subject: String,
    },

    /// The manager has been shut down.
    #[error("cache manager is closed")]
    Closed,
}
