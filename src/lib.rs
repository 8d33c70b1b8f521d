#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! A validated cache of certification authorities discovered from a single trust anchor.
//!
//! Starting at a self-signed anchor, the cache follows the SIA `caRepository` locators every
//! authority publishes, fetches the certs-only bundles found there, and keeps the CA
//! certificates issued by that authority. The resulting graph is validated entry by entry
//! with RFC 5280 path processing (policy tree, basic constraints, key usage and CRL
//! revocation checking), entries that fail are pruned and recorded as rejected, and the
//! validated cache is published atomically for path building and administrative reads.
//!
//! The primary entry point is [`CacheManager`].
//!
//! ```no_run
//! use trust_cache::config::AnchorSource;
//! use trust_cache::CacheManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = CacheManager::builder()
//!     .anchor_source(AnchorSource::Path("anchor.pem".into()))
//!     .build()
//!     .await?;
//!
//! // Every validated intermediate, with its locators and policy outcome.
//! for entry in manager.intermediate_entries() {
//!     println!(
//!         "{} -> {:?}",
//!         entry.certificate().subject(),
//!         entry.policy_outcome().map(|outcome| &outcome.valid_policies)
//!     );
//! }
//!
//! // Certificates refused during discovery or validation.
//! for rejection in manager.rejected_entries() {
//!     println!("{}: {}", rejection.certificate().subject(), rejection.reason());
//! }
//!
//! // Path from an entry back to the anchor, by CertID.
//! if let Some(entry) = manager.intermediate_entries().first() {
//!     let path = manager.signer_path(entry.subject_id())?;
//!     println!("path length {}", path.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`http`** (default): `reqwest`-backed [`HttpTransport`].
//! - **`logging`** (default): log through the `log` facade.
//! - **`tracing`**: log through `tracing` instead.

mod observability;
mod prelude;

pub mod bundle;
pub mod cache;
pub mod cert;
pub mod config;
pub mod constants;
pub mod crl_cache;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod locator;
pub mod manager;
pub mod ocsp;
pub mod policy;
pub mod rejected;
pub mod transport;
pub mod uri_cache;
pub mod validation_pass;
pub mod validator;

#[cfg(test)]
mod test_support;

// -----------------------
// Re-exports
// -----------------------

pub use crate::{
    bundle::{BundleError, CertBundle},
    cache::{CacheError, EntryId, TrustCache},
    cert::{cert_id::CertId, crl::Crl, error::CertificateError, key_id::KeyId, Certificate},
    config::{CacheConfig, ConfigError},
    discovery::{DescentPath, DiscoveryEngine, LocatorPolicy},
    entry::CaEntry,
    error::Error,
    manager::{CacheManager, CacheManagerBuilder, CacheSnapshot, CacheUpdates, UriCacheView},
    ocsp::{OcspClient, OcspStatus},
    policy::{PolicyOutcome, PolicyTree},
    rejected::{Rejection, RejectionRegistry},
    transport::{Fetcher, Transport, TransportError},
    validator::{PathBuildResult, PathValidationError, PathValidator, ValidationSettings},
};

#[cfg(feature = "http")]
pub use crate::transport::HttpTransport;
