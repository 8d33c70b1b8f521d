//! Builder for [`CacheManager`].

use super::CacheManager;
use crate::cert::Certificate;
use crate::config::{
    AnchorSource, CacheConfig, ConfigError, DiscoveryConfig, HttpConfig, RefreshConfig,
};
use crate::error::Error;
use crate::transport::{Fetcher, Transport};
use crate::uri_cache::UriCache;
use crate::validator::ValidationSettings;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`CacheManager`].
///
/// The anchor is required, either as a certificate or as an [`AnchorSource`]. Without an
/// explicit transport, an [`HttpTransport`](crate::transport::HttpTransport) is built from the
/// HTTP settings (feature `http`).
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use trust_cache::config::AnchorSource;
/// use trust_cache::CacheManager;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = CacheManager::builder()
///     .anchor_source(AnchorSource::Path("anchor.pem".into()))
///     .refresh_interval(Some(Duration::from_secs(3600)))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CacheManagerBuilder {
    anchor: Option<Certificate>,
    anchor_source: Option<AnchorSource>,
    transport: Option<Arc<dyn Transport>>,
    http: HttpConfig,
    validation: ValidationSettings,
    discovery: DiscoveryConfig,
    refresh: RefreshConfig,
}

impl Debug for CacheManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManagerBuilder")
            .field("anchor", &self.anchor)
            .field("anchor_source", &self.anchor_source)
            .field("transport", &self.transport.as_ref().map(|_| "<Transport>"))
            .field("http", &self.http)
            .field("validation", &self.validation)
            .field("discovery", &self.discovery)
            .field("refresh", &self.refresh)
            .finish()
    }
}

impl Default for CacheManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManagerBuilder {
    /// Creates a builder with default settings and no anchor.
    pub fn new() -> Self {
        Self {
            anchor: None,
            anchor_source: None,
            transport: None,
            http: HttpConfig::default(),
            validation: ValidationSettings::default(),
            discovery: DiscoveryConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }

    /// Applies every setting of `config`.
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.anchor_source = Some(config.anchor);
        self.http = config.http;
        self.validation = config.validation;
        self.discovery = config.discovery;
        self.refresh = config.refresh;
        self
    }

    /// Sets the trust anchor. Takes precedence over an anchor source.
    #[must_use]
    pub fn anchor(mut self, anchor: Certificate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Sets where the trust anchor is loaded from.
    #[must_use]
    pub fn anchor_source(mut self, source: AnchorSource) -> Self {
        self.anchor_source = Some(source);
        self
    }

    /// Sets the transport used for every fetch.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the HTTP settings of the default transport.
    #[must_use]
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Sets the path validation settings.
    #[must_use]
    pub fn validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = validation;
        self
    }

    /// Sets the discovery settings.
    #[must_use]
    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Sets the periodic rebuild settings.
    #[must_use]
    pub fn refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    /// Sets the periodic rebuild interval; `None` disables the refresh task.
    #[must_use]
    pub fn refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh.interval = interval;
        self
    }

    /// Loads the anchor and runs the initial build.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no anchor was given or it cannot be loaded.
    /// - [`Error::Cache`] if the anchor is not a self-signed CA certificate.
    /// - [`Error::Transport`] if the default transport cannot be built.
    pub async fn build(self) -> Result<CacheManager, Error> {
        let anchor = match (self.anchor, self.anchor_source) {
            (Some(anchor), _) => anchor,
            (None, Some(source)) => source.load()?,
            (None, None) => return Err(ConfigError::MissingAnchor.into()),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.http)?,
        };
        let fetcher = Fetcher::new(transport, Arc::new(UriCache::new()));

        CacheManager::build_with(
            anchor,
            fetcher,
            self.validation,
            self.discovery,
            self.refresh,
        )
        .await
    }
}

#[cfg(feature = "http")]
fn default_transport(http: &HttpConfig) -> Result<Arc<dyn Transport>, Error> {
    Ok(Arc::new(crate::transport::HttpTransport::new(http)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_http: &HttpConfig) -> Result<Arc<dyn Transport>, Error> {
    Err(crate::transport::TransportError::Client(
        "no transport configured and feature `http` is disabled".to_string(),
    )
    .into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::discovery::LocatorPolicy;

    #[test]
    fn test_config_overrides_defaults() {
        let config = CacheConfig {
            anchor: AnchorSource::Pem(String::new()),
            http: HttpConfig::default(),
            validation: ValidationSettings {
                max_path_length: 3,
                ..ValidationSettings::default()
            },
            discovery: DiscoveryConfig {
                locator_policy: LocatorPolicy::TryAll,
            },
            refresh: RefreshConfig {
                interval: Some(Duration::from_secs(60)),
            },
        };
        let builder = CacheManagerBuilder::new().config(config);

        assert_eq!(builder.validation.max_path_length, 3);
        assert_eq!(builder.discovery.locator_policy, LocatorPolicy::TryAll);
        assert_eq!(builder.refresh.interval, Some(Duration::from_secs(60)));
        assert!(builder.anchor_source.is_some());

        let builder = builder.refresh_interval(None);
        assert_eq!(builder.refresh.interval, None);
    }

    #[tokio::test]
    async fn test_build_without_anchor_fails() {
        let err = CacheManagerBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingAnchor)));
    }

    #[tokio::test]
    async fn test_empty_anchor_source_fails() {
        let err = CacheManagerBuilder::new()
            .anchor_source(AnchorSource::Pem(String::new()))
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
