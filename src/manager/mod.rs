//! Cache manager: builds, publishes and serves the validated trust cache.
//!
//! A build loads the anchor, discovers the trust graph, fetches the CRLs of every discovered
//! entry, validates the graph and publishes the result with a single pointer swap. Readers
//! load the current [`CacheSnapshot`] without locking and never observe a partial build.
//! Builds are serialised; network I/O happens before the swap, never while readers wait.
//!
//! # Example
//!
//! ```no_run
//! use trust_cache::{CacheConfig, CacheManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::from_file("trust-cache.json")?;
//! let manager = CacheManager::builder().config(config).build().await?;
//!
//! for entry in manager.intermediate_entries() {
//!     println!("{}", entry.certificate().subject());
//! }
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod refresh;

pub use builder::CacheManagerBuilder;

use crate::bundle::{BundleError, CertBundle};
use crate::cache::{CacheError, TrustCache};
use crate::cert::cert_id::CertId;
use crate::cert::crl::Crl;
use crate::cert::Certificate;
use crate::config::{DiscoveryConfig, RefreshConfig};
use crate::crl_cache::CrlCache;
use crate::discovery::{DiscoveryEngine, DiscoverySummary};
use crate::entry::CaEntry;
use crate::error::Error;
use crate::locator::{http_locators, LocatorKind};
use crate::ocsp::{OcspClient, OcspStatus};
use crate::prelude::{debug, info, warn};
use crate::rejected::{Rejection, RejectionRegistry};
use crate::transport::Fetcher;
use crate::uri_cache::{UriCache, UriCacheEntry};
use crate::validation_pass::{validate_cache, ValidationSummary};
use crate::validator::{PathBuildResult, PathValidationError, PathValidator, ValidationSettings};
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::fmt::{self, Debug, Write as _};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A published, validated trust cache together with the CRLs it was validated against.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    cache: TrustCache,
    crls: Vec<Crl>,
    built_at: OffsetDateTime,
    discovery: DiscoverySummary,
    validation: ValidationSummary,
}

impl CacheSnapshot {
    fn anchor_only(anchor: Certificate) -> Result<Self, CacheError> {
        let mut cache = TrustCache::new(anchor)?;
        cache.flatten();
        Ok(Self {
            cache,
            crls: Vec::new(),
            built_at: OffsetDateTime::now_utc(),
            discovery: DiscoverySummary::default(),
            validation: ValidationSummary::default(),
        })
    }

    /// The validated, flattened cache.
    pub fn cache(&self) -> &TrustCache {
        &self.cache
    }

    /// CRLs used during validation.
    pub fn crls(&self) -> &[Crl] {
        &self.crls
    }

    /// When the build completed.
    pub fn built_at(&self) -> OffsetDateTime {
        self.built_at
    }

    /// Discovery counts of the build.
    pub fn discovery(&self) -> DiscoverySummary {
        self.discovery
    }

    /// Validation counts of the build.
    pub fn validation(&self) -> ValidationSummary {
        self.validation
    }
}

/// Which URI-cache entries to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriCacheView {
    /// Every recorded fetch.
    All,
    /// Fetches answered with a 2xx status.
    Successful,
    /// Fetches that failed or were answered with another status.
    Failed,
}

/// Handle for receiving rebuild notifications from a [`CacheManager`].
///
/// The sequence starts at 0 after the initial build and increases by one on every published
/// rebuild. Slow receivers may skip intermediate values.
#[derive(Clone, Debug)]
pub struct CacheUpdates {
    rx: watch::Receiver<u64>,
}

impl CacheUpdates {
    /// Waits for the next published rebuild and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the manager has been dropped.
    pub async fn changed(&mut self) -> Result<u64, Error> {
        self.rx.changed().await.map_err(|_| Error::Closed)?;
        Ok(*self.rx.borrow())
    }

    /// Returns the last sequence number without waiting.
    pub fn last(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Waits until the sequence number satisfies `f`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the manager has been dropped.
    pub async fn wait_for<F>(&mut self, mut f: F) -> Result<u64, Error>
    where
        F: FnMut(&u64) -> bool,
    {
        let current = self.last();
        if f(&current) {
            return Ok(current);
        }
        loop {
            let seq = self.changed().await?;
            if f(&seq) {
                return Ok(seq);
            }
        }
    }
}

/// Owner of the trust cache and of the services that build it.
///
/// Cloning is cheap; clones share the same cache. Dropping the last clone stops the refresh
/// task.
#[derive(Clone, Debug)]
pub struct CacheManager {
    inner: Arc<Inner>,
    _cancel_on_drop: Arc<DropGuard>,
}

pub(super) struct Inner {
    // Last published build.
    snapshot: ArcSwap<CacheSnapshot>,

    anchor: Certificate,
    settings: ValidationSettings,

    // Build services.
    discovery: DiscoveryEngine,
    uri_cache: Arc<UriCache>,
    crl_cache: CrlCache,
    ocsp: OcspClient,
    registry: Arc<RejectionRegistry>,
    build_lock: Mutex<()>,

    // Lifecycle.
    closed: AtomicBool,
    cancel: CancellationToken,

    // Rebuild notifications.
    update_seq: AtomicU64,
    update_tx: watch::Sender<u64>,
    update_rx: watch::Receiver<u64>,

    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("snapshot", &"<ArcSwap<CacheSnapshot>>")
            .field("anchor", &self.anchor)
            .field("settings", &self.settings)
            .field("discovery", &self.discovery)
            .field("uri_cache", &self.uri_cache.len())
            .field("crl_cache", &self.crl_cache.uris())
            .field("registry", &self.registry.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field("cancel", &self.cancel)
            .field("update_seq", &self.update_seq)
            .field("refresh", &"<Mutex<Option<JoinHandle<()>>>>")
            .finish()
    }
}

impl CacheManager {
    /// Creates a builder.
    pub fn builder() -> CacheManagerBuilder {
        CacheManagerBuilder::new()
    }

    pub(super) async fn build_with(
        anchor: Certificate,
        fetcher: Fetcher,
        settings: ValidationSettings,
        discovery: DiscoveryConfig,
        refresh: RefreshConfig,
    ) -> Result<Self, Error> {
        let snapshot = CacheSnapshot::anchor_only(anchor.clone())?;
        let registry = Arc::new(RejectionRegistry::new());
        let (update_tx, update_rx) = watch::channel(0u64);

        let inner = Arc::new(Inner {
            snapshot: ArcSwap::from_pointee(snapshot),
            anchor,
            settings,
            discovery: DiscoveryEngine::new(
                fetcher.clone(),
                Arc::clone(&registry),
                discovery.locator_policy,
            ),
            uri_cache: Arc::clone(fetcher.uri_cache()),
            crl_cache: CrlCache::new(fetcher.clone()),
            ocsp: OcspClient::new(fetcher),
            registry,
            build_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            update_seq: AtomicU64::new(0),
            update_tx,
            update_rx,
            refresh: Mutex::new(None),
        });

        {
            let _guard = inner.build_lock.lock().await;
            let snapshot = inner.build().await?;
            inner.snapshot.store(Arc::new(snapshot));
        }

        if let Some(interval) = refresh.interval {
            let task_inner = Arc::clone(&inner);
            let token = task_inner.cancel.clone();
            let handle = tokio::spawn(async move {
                task_inner.run_refresh(token, interval).await;
            });
            *inner.refresh.lock().await = Some(handle);
        }

        let cancel_on_drop = Arc::new(inner.cancel.clone().drop_guard());
        Ok(Self {
            inner,
            _cancel_on_drop: cancel_on_drop,
        })
    }

    /// Returns a handle for receiving rebuild notifications.
    pub fn updated(&self) -> CacheUpdates {
        CacheUpdates {
            rx: self.inner.update_rx.clone(),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.inner.snapshot.load_full()
    }

    /// Re-runs discovery and validation and publishes the result.
    ///
    /// Concurrent calls are serialised. Rejections recorded by earlier builds stay in force.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] after [`CacheManager::shutdown`], or the build failure. The
    /// previous snapshot stays published on failure.
    pub async fn rebuild(&self) -> Result<(), Error> {
        self.inner.rebuild().await
    }

    /// Clears the URI cache, the CRL cache and the rejection registry, then rebuilds.
    ///
    /// # Errors
    ///
    /// See [`CacheManager::rebuild`].
    pub async fn reset(&self) -> Result<(), Error> {
        self.inner.assert_open()?;
        info!("Resetting trust cache");
        self.inner.uri_cache.clear();
        self.inner.crl_cache.clear();
        self.inner.registry.clear();
        self.inner.rebuild().await
    }

    /// The anchor entry.
    pub fn anchor_entry(&self) -> CaEntry {
        self.inner.snapshot.load().cache.anchor().clone()
    }

    /// Every validated intermediate in tree order.
    pub fn intermediate_entries(&self) -> Vec<CaEntry> {
        self.inner
            .snapshot
            .load()
            .cache
            .intermediates()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Every rejection recorded since startup or the last reset, oldest first.
    pub fn rejected_entries(&self) -> Vec<Rejection> {
        self.inner.registry.entries()
    }

    /// Recorded fetches of the current build cycle.
    pub fn uri_cache_entries(&self, view: UriCacheView) -> Vec<UriCacheEntry> {
        match view {
            UriCacheView::All => self.inner.uri_cache.entries(),
            UriCacheView::Successful => self.inner.uri_cache.successful(),
            UriCacheView::Failed => self.inner.uri_cache.failed(),
        }
    }

    /// The entry identified by `id`; `None` for the anchor's own id.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] for an id not in the cache.
    pub fn signer(&self, id: &CertId) -> Result<Option<CaEntry>, CacheError> {
        let snapshot = self.inner.snapshot.load();
        if id == snapshot.cache.anchor().subject_id() {
            return Ok(None);
        }
        snapshot.cache.lookup(id).map(|entry| Some(entry.clone()))
    }

    /// Entries from `id` up to and including the anchor.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] for an id not in the cache.
    pub fn signer_path(&self, id: &CertId) -> Result<Vec<CaEntry>, CacheError> {
        let snapshot = self.inner.snapshot.load();
        let anchor = snapshot.cache.anchor();
        if id == anchor.subject_id() {
            return Ok(vec![anchor.clone()]);
        }
        let path = snapshot.cache.path_to_anchor(id)?;
        Ok(path.into_iter().cloned().collect())
    }

    /// [`CacheManager::signer_path`] for an id given as url-safe base64 DER.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if the id does not decode, else see
    /// [`CacheManager::signer_path`].
    pub fn cert_path_by_b64(&self, encoded: &str) -> Result<Vec<CaEntry>, Error> {
        let id = CertId::from_url_safe_base64(encoded)?;
        Ok(self.signer_path(&id)?)
    }

    /// The anchor and every intermediate as PEM, each preceded by `subject=` and `issuer=`
    /// lines.
    pub fn cache_as_pem(&self) -> String {
        let snapshot = self.inner.snapshot.load();
        let cache = &snapshot.cache;
        let mut out = String::new();
        for entry in std::iter::once(cache.anchor()).chain(cache.intermediates()) {
            let cert = entry.certificate();
            let _ = writeln!(out, "subject={}", cert.subject());
            let _ = writeln!(out, "issuer={}", cert.issuer());
            out.push_str(&cert.to_pem());
            out.push('\n');
        }
        out
    }

    /// The validated intermediates as a certs-only CMS bundle.
    ///
    /// # Errors
    ///
    /// Returns a [`BundleError`] if encoding fails.
    pub fn cache_as_certs_only(&self) -> Result<Vec<u8>, BundleError> {
        let certificates = self
            .intermediate_entries()
            .into_iter()
            .map(|entry| entry.certificate().clone())
            .collect();
        CertBundle::from_certificates(certificates).to_certs_only_der()
    }

    /// For each cached authority that signed `cert`, the chain `cert`, signer, ..., anchor.
    pub fn all_paths(&self, cert: &Certificate) -> Vec<Vec<Certificate>> {
        let snapshot = self.inner.snapshot.load();
        let cache = &snapshot.cache;
        let anchor = cache.anchor();
        let mut paths = Vec::new();

        if anchor.is_signer_of(cert) {
            paths.push(vec![cert.clone(), anchor.certificate().clone()]);
        }
        for signer in cache.intermediates() {
            if !signer.is_signer_of(cert) {
                continue;
            }
            match cache.path_to_anchor(signer.subject_id()) {
                Ok(path) => {
                    let mut chain = vec![cert.clone()];
                    chain.extend(path.into_iter().map(|entry| entry.certificate().clone()));
                    paths.push(chain);
                }
                Err(e) => debug!(
                    "Skipping signer without path; subject={}, error={}",
                    signer.certificate().subject(),
                    e
                ),
            }
        }
        paths
    }

    /// A validator over the published intermediates and the CRLs they were validated with.
    pub fn path_validator(&self) -> PathValidator {
        let snapshot = self.inner.snapshot.load();
        PathValidator::new(
            self.inner.anchor.clone(),
            certificates(&snapshot.cache),
            snapshot.crls.clone(),
            self.inner.settings.clone(),
        )
    }

    /// Builds and validates a path for `target` against the published cache.
    ///
    /// # Errors
    ///
    /// Returns the [`PathValidationError`] of the search.
    pub fn build_path(
        &self,
        target: &Certificate,
        check_revocation: bool,
    ) -> Result<PathBuildResult, PathValidationError> {
        self.path_validator().build_path(target, check_revocation)
    }

    /// Queries the first HTTP OCSP responder of `cert`, using its cached signer as issuer.
    ///
    /// # Errors
    ///
    /// - [`Error::NoOcspResponder`] if `cert` publishes no HTTP responder.
    /// - [`Error::Cache`] if no cached authority signed `cert`.
    /// - [`Error::Ocsp`] if the exchange fails.
    pub async fn ocsp_status(&self, cert: &Certificate) -> Result<OcspStatus, Error> {
        self.inner.assert_open()?;
        let responder = http_locators(&cert.locators().ocsp, LocatorKind::Ocsp)
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoOcspResponder {
                subject: cert.subject().to_string(),
            })?;
        let issuer = self.signer_of(cert).ok_or(CacheError::NotFound)?;
        Ok(self.inner.ocsp.check(cert, &issuer, &responder).await?)
    }

    fn signer_of(&self, cert: &Certificate) -> Option<Certificate> {
        let snapshot = self.inner.snapshot.load();
        let cache = &snapshot.cache;
        std::iter::once(cache.anchor())
            .chain(cache.intermediates())
            .find(|entry| entry.is_signer_of(cert))
            .map(|entry| entry.certificate().clone())
    }

    /// Stops the refresh task and waits for it to finish. Idempotent.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.refresh.lock().await.take() {
            if let Err(_e) = handle.await {
                warn!("Error joining refresh task during shutdown: error={}", _e);
            }
        }
    }
}

impl Inner {
    fn assert_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) || self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    pub(super) async fn rebuild(&self) -> Result<(), Error> {
        self.assert_open()?;
        let _guard = self.build_lock.lock().await;
        let snapshot = self.build().await?;
        self.snapshot.store(Arc::new(snapshot));
        self.notify_update();
        Ok(())
    }

    fn notify_update(&self) {
        let next = self.update_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.update_tx.send(next);
    }

    async fn build(&self) -> Result<CacheSnapshot, Error> {
        let started = Instant::now();
        let mut cache = TrustCache::new(self.anchor.clone())?;

        self.uri_cache.clear();
        let discovery = self.discovery.discover(&mut cache).await;
        cache.flatten();
        info!(
            "Discovered trust graph; entries={}, elapsed_ms={}",
            cache.len(),
            started.elapsed().as_millis()
        );

        let stale = self.crl_cache.drop_stale(OffsetDateTime::now_utc());
        if stale > 0 {
            debug!("Dropped stale CRLs; count={}", stale);
        }
        let crls = self.fetch_crls(&cache).await;

        let validator = PathValidator::new(
            self.anchor.clone(),
            certificates(&cache),
            crls.clone(),
            self.settings.clone(),
        );
        let (validated, validation) = validate_cache(&cache, &validator, &self.registry);
        info!(
            "Built trust cache; entries={}, pruned={}, crls={}, elapsed_ms={}",
            validated.len(),
            validation.pruned,
            crls.len(),
            started.elapsed().as_millis()
        );

        Ok(CacheSnapshot {
            cache: validated,
            crls,
            built_at: OffsetDateTime::now_utc(),
            discovery,
            validation,
        })
    }

    async fn fetch_crls(&self, cache: &TrustCache) -> Vec<Crl> {
        let locators: Vec<_> = cache
            .intermediates()
            .into_iter()
            .flat_map(|entry| entry.crl_locators().iter().cloned())
            .collect();

        let mut seen = HashSet::new();
        let mut crls = Vec::new();
        for locator in locators {
            if !seen.insert(locator.as_str().to_string()) {
                continue;
            }
            match self.crl_cache.get_crl(&locator).await {
                Ok(crl) => crls.push(crl),
                Err(e) => warn!("Failed to obtain CRL; uri={}, error={}", locator, e),
            }
        }
        crls
    }
}

fn certificates(cache: &TrustCache) -> Vec<Certificate> {
    cache
        .intermediates()
        .into_iter()
        .map(|entry| entry.certificate().clone())
        .collect()
}
