//! Configuration of the cache manager.
//!
//! Every struct has a `Default` matching the reference deployment and deserialises from JSON
//! with missing fields taking their defaults. Durations are given in whole seconds.

use crate::cert::error::CertificateError;
use crate::cert::Certificate;
use crate::constants::{DEFAULT_MAX_BODY_BYTES, DEFAULT_NETWORK_TIMEOUT, DEFAULT_USER_AGENT};
use crate::discovery::LocatorPolicy;
use crate::validator::ValidationSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON document is invalid.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The trust anchor could not be decoded.
    #[error("invalid trust anchor: {0}")]
    Anchor(#[from] CertificateError),

    /// The anchor source held no certificate.
    #[error("trust anchor source contains no certificate")]
    MissingAnchor,
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout.
    #[serde(with = "secs", rename = "connect_timeout_secs")]
    pub connect_timeout: Duration,
    /// Overall request timeout.
    #[serde(with = "secs", rename = "timeout_secs")]
    pub timeout: Duration,
    /// `User-Agent` header.
    pub user_agent: String,
    /// Largest accepted response body.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_NETWORK_TIMEOUT,
            timeout: DEFAULT_NETWORK_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Discovery settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// What to do with an authority's remaining locators after one is skipped or fails.
    pub locator_policy: LocatorPolicy,
}

/// Periodic rebuild settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Rebuild interval; `None` disables the background task.
    #[serde(with = "opt_secs", rename = "interval_secs")]
    pub interval: Option<Duration>,
}

/// Where the trust anchor comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    /// A PEM or DER file.
    Path(PathBuf),
    /// Inline PEM.
    Pem(String),
}

impl AnchorSource {
    /// Loads the first certificate of the source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the source cannot be read or holds no certificate.
    pub fn load(&self) -> Result<Certificate, ConfigError> {
        let bytes = match self {
            AnchorSource::Path(path) => read(path)?,
            AnchorSource::Pem(pem) => pem.clone().into_bytes(),
        };
        let certs = if bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
            Certificate::from_pem(&bytes)?
        } else {
            Certificate::from_der_chain(&bytes)?
        };
        certs.into_iter().next().ok_or(ConfigError::MissingAnchor)
    }
}

/// Complete configuration of a [`CacheManager`](crate::manager::CacheManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// The trust anchor.
    pub anchor: AnchorSource,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Path validation settings.
    #[serde(default)]
    pub validation: ValidationSettings,
    /// Discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Periodic rebuild settings.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl CacheConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for invalid JSON, unknown policy names included.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, else see [`CacheConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

pub(crate) mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => s.serialize_some(&value.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{root, Profile};

    #[test]
    fn test_minimal_json_takes_defaults() {
        let config = CacheConfig::from_json(r#"{"anchor": {"path": "/etc/anchor.pem"}}"#).unwrap();
        assert_eq!(config.anchor, AnchorSource::Path("/etc/anchor.pem".into()));
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.validation, ValidationSettings::default());
        assert_eq!(config.discovery.locator_policy, LocatorPolicy::StopOnFirstFailure);
        assert_eq!(config.refresh.interval, None);
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "anchor": {"pem": "-----BEGIN CERTIFICATE-----"},
            "http": {
                "connect_timeout_secs": 5,
                "timeout_secs": 10,
                "user_agent": "ua",
                "max_body_bytes": 1024
            },
            "validation": {
                "initial_policies": ["id-fpki-common-authentication", "1.2.3.4"],
                "any_policy_inhibited": false,
                "max_path_length": 5
            },
            "discovery": {"locator_policy": "try_all"},
            "refresh": {"interval_secs": 3600}
        }"#;
        let config = CacheConfig::from_json(json).unwrap();

        assert_eq!(config.http.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.http.max_body_bytes, 1024);
        assert!(config
            .validation
            .initial_policies
            .contains("2.16.840.1.101.3.2.1.3.13"));
        assert!(config.validation.initial_policies.contains("1.2.3.4"));
        assert!(!config.validation.any_policy_inhibited);
        assert!(config.validation.explicit_policy_required);
        assert_eq!(config.validation.max_path_length, 5);
        assert_eq!(config.discovery.locator_policy, LocatorPolicy::TryAll);
        assert_eq!(config.refresh.interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_unknown_policy_name_is_an_error() {
        let json = r#"{"anchor": {"pem": ""}, "validation": {"initial_policies": ["bogus"]}}"#;
        assert!(matches!(CacheConfig::from_json(json), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_inline_pem_anchor_loads() {
        let x = root("X", &Profile::default());
        let source = AnchorSource::Pem(x.cert.to_pem());
        assert_eq!(source.load().unwrap(), x.cert);

        let empty = AnchorSource::Pem(String::new());
        assert!(empty.load().is_err());
    }
}
