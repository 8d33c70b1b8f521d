//! Network locators published in certificate extensions.

use crate::prelude::debug;
use std::fmt;
use url::Url;

/// Where a locator was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    /// SIA `id-ad-caRepository`: bundle of certificates issued by the authority.
    CaRepository,
    /// AIA `id-ad-caIssuers`.
    CaIssuers,
    /// AIA `id-ad-ocsp`.
    Ocsp,
    /// CRL distribution point.
    CrlDistributionPoint,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocatorKind::CaRepository => "SIA",
            LocatorKind::CaIssuers => "AIA",
            LocatorKind::Ocsp => "OCSP",
            LocatorKind::CrlDistributionPoint => "CDP",
        })
    }
}

/// A parsed, normalised URI together with the extension it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    url: Url,
    kind: LocatorKind,
}

impl Locator {
    /// Parses `uri`.
    ///
    /// # Errors
    /// Returns the URL parse error for malformed input.
    pub fn parse(uri: &str, kind: LocatorKind) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(uri.trim())?,
            kind,
        })
    }

    /// Returns `true` for `http` and `https` locators.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// The normalised URI, used as the cache key.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The publishing extension.
    pub fn kind(&self) -> LocatorKind {
        self.kind
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Parses the HTTP locators among `uris`, skipping other schemes and malformed values.
pub(crate) fn http_locators(uris: &[String], kind: LocatorKind) -> Vec<Locator> {
    uris.iter()
        .filter_map(|uri| match Locator::parse(uri, kind) {
            Ok(locator) if locator.is_http() => Some(locator),
            Ok(_) => None,
            Err(_e) => {
                debug!("Skipping malformed {} locator: uri={}, error={}", kind, uri, _e);
                None
            }
        })
        .collect()
}
