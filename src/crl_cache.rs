//! CRLs fetched from distribution points, cached by URI.

use crate::cert::crl::Crl;
use crate::cert::error::CertificateError;
use crate::locator::Locator;
use crate::prelude::{debug, warn};
use crate::transport::{Fetcher, TransportError};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;

/// Errors returned by [`CrlCache::get_crl`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CrlError {
    /// The fetch failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The distribution point answered without a CRL.
    #[error("no CRL returned by {uri}")]
    NoData {
        /// The distribution point.
        uri: String,
    },

    /// The body is not a CRL.
    #[error("failed decoding CRL from {uri}: {source}")]
    Decode {
        /// The distribution point.
        uri: String,
        /// Decoder error.
        #[source]
        source: CertificateError,
    },
}

/// Fetch-once cache of CRLs. Entries are only removed by explicit calls.
#[derive(Debug)]
pub struct CrlCache {
    fetcher: Fetcher,
    crls: RwLock<HashMap<String, Crl>>,
}

impl CrlCache {
    /// Creates an empty cache fetching through `fetcher`.
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            crls: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the CRL published at `locator`, fetching and decoding it on first access.
    ///
    /// # Errors
    ///
    /// Returns a [`CrlError`] if the fetch fails, yields no body, or does not decode.
    pub async fn get_crl(&self, locator: &Locator) -> Result<Crl, CrlError> {
        if let Some(crl) = self.cached(locator.as_str()) {
            return Ok(crl);
        }

        let body = self
            .fetcher
            .get(locator)
            .await?
            .ok_or_else(|| CrlError::NoData {
                uri: locator.to_string(),
            })?;
        let crl = Crl::from_bytes(&body).map_err(|source| {
            warn!("Failed decoding CRL; uri={}, error={}", locator, source);
            CrlError::Decode {
                uri: locator.to_string(),
                source,
            }
        })?;
        debug!(
            "Cached CRL; uri={}, issuer={}, revoked={}",
            locator,
            crl.issuer(),
            crl.revoked_count()
        );

        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.as_str().to_string(), crl.clone());
        Ok(crl)
    }

    /// Stores `crl` under `uri`.
    pub fn insert(&self, uri: impl Into<String>, crl: Crl) {
        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.into(), crl);
    }

    fn cached(&self, uri: &str) -> Option<Crl> {
        self.crls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    /// Every cached CRL.
    pub fn crls(&self) -> Vec<Crl> {
        self.crls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Cached URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self
            .crls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        uris.sort();
        uris
    }

    /// Removes the CRL cached for `uri`.
    pub fn invalidate(&self, uri: &str) -> Option<Crl> {
        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
    }

    /// Removes CRLs whose next update is before `instant`. Returns how many were removed.
    pub fn drop_stale(&self, instant: OffsetDateTime) -> usize {
        let mut crls = self.crls.write().unwrap_or_else(PoisonError::into_inner);
        let before = crls.len();
        crls.retain(|_, crl| crl.is_current_at(instant));
        before - crls.len()
    }

    /// Removes every CRL.
    pub fn clear(&self) {
        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
