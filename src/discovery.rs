//! Recursive discovery of the trust graph through SIA `caRepository` bundles.
//!
//! Starting at an authority, every HTTP repository locator it publishes is fetched once per
//! build and decoded as a certs-only bundle. A candidate becomes a child entry when it is a
//! CA certificate signed by the authority, is currently valid and not already rejected, and
//! its key does not already appear on the path from the anchor. Accepted children are
//! discovered in turn before being attached.

use crate::bundle::CertBundle;
use crate::cache::{EntryId, TrustCache};
use crate::cert::key_id::KeyId;
use crate::cert::Certificate;
use crate::entry::CaEntry;
use crate::locator::Locator;
use crate::prelude::{debug, info, warn};
use crate::rejected::RejectionRegistry;
use crate::transport::Fetcher;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Key identifiers of the authorities between the anchor and the entry being discovered.
///
/// Immutable: [`DescentPath::with`] returns an extended copy, so sibling subtrees never see
/// each other's keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescentPath {
    keys: Arc<HashSet<KeyId>>,
}

impl DescentPath {
    /// A path holding only the anchor's key identifier.
    pub fn from_anchor(anchor: &Certificate) -> Self {
        Self::default().with(KeyId::for_subject(anchor))
    }

    /// Returns this path extended with `key_id`.
    #[must_use]
    pub fn with(&self, key_id: KeyId) -> Self {
        let mut keys = (*self.keys).clone();
        keys.insert(key_id);
        Self {
            keys: Arc::new(keys),
        }
    }

    /// Returns `true` if `key_id` is on the path.
    pub fn contains(&self, key_id: &KeyId) -> bool {
        self.keys.contains(key_id)
    }

    /// Number of keys on the path.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` for an empty path.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// What discovery does when a repository locator of an authority cannot be fetched.
///
/// Locators already fetched during the current build are skipped under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorPolicy {
    /// Abandon the authority when its first locator fails; later failures are skipped.
    #[default]
    StopOnFirstFailure,
    /// Skip any failed locator and continue with the next one.
    TryAll,
}

/// Counts produced by a discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Bundles fetched with a 2xx response.
    pub bundles: usize,
    /// Candidates seen across all bundles.
    pub candidates: usize,
    /// Candidates attached to the graph.
    pub accepted: usize,
}

/// Walks SIA locators and grows a [`TrustCache`].
#[derive(Debug, Clone)]
pub struct DiscoveryEngine {
    fetcher: Fetcher,
    registry: Arc<RejectionRegistry>,
    policy: LocatorPolicy,
}

enum Fetched {
    Bundle(Vec<Certificate>),
    AlreadySeen,
    Failed,
}

impl DiscoveryEngine {
    /// Creates an engine fetching through `fetcher` and rejecting into `registry`.
    pub fn new(fetcher: Fetcher, registry: Arc<RejectionRegistry>, policy: LocatorPolicy) -> Self {
        Self {
            fetcher,
            registry,
            policy,
        }
    }

    /// Discovers everything reachable from the anchor of `cache`.
    ///
    /// The descent path starts with the anchor's key, so a certificate for the anchor key
    /// published further down is refused.
    pub async fn discover(&self, cache: &mut TrustCache) -> DiscoverySummary {
        let path = DescentPath::from_anchor(cache.anchor().certificate());
        let root = cache.root();
        let mut summary = DiscoverySummary::default();
        self.discover_from(cache, root, path, &mut summary).await;
        info!(
            "Discovery finished; bundles={}, candidates={}, accepted={}",
            summary.bundles, summary.candidates, summary.accepted
        );
        summary
    }

    /// Discovers the subtree below `parent`, which must already be in `cache`.
    pub fn discover_from<'a>(
        &'a self,
        cache: &'a mut TrustCache,
        parent: EntryId,
        path: DescentPath,
        summary: &'a mut DiscoverySummary,
    ) -> BoxFuture<'a, ()> {
        async move {
            let Some(authority) = cache.entry(parent).map(CaEntry::detached) else {
                return;
            };
            if authority.repository_locators().is_empty() {
                debug!(
                    "No repository locators; subject={}",
                    authority.certificate().subject()
                );
                return;
            }

            for (position, locator) in authority.repository_locators().iter().enumerate() {
                let candidates = match self.fetch_bundle(locator).await {
                    Fetched::Bundle(candidates) => candidates,
                    Fetched::AlreadySeen => continue,
                    Fetched::Failed
                        if position == 0 && self.policy == LocatorPolicy::StopOnFirstFailure =>
                    {
                        debug!(
                            "First repository locator failed, skipping authority; subject={}",
                            authority.certificate().subject()
                        );
                        break;
                    }
                    Fetched::Failed => continue,
                };
                summary.bundles += 1;
                summary.candidates += candidates.len();

                for candidate in candidates {
                    if !self.accept(&authority, &candidate, &path, locator.as_str()) {
                        continue;
                    }
                    let key_id = KeyId::for_subject(&candidate);
                    info!(
                        "Accepted certificate; subject={}, issuer={}, source={}",
                        candidate.subject(),
                        authority.certificate().subject(),
                        locator
                    );
                    let child = cache.insert(CaEntry::issued_by(&authority, candidate));
                    summary.accepted += 1;
                    self.discover_from(cache, child, path.with(key_id), summary)
                        .await;
                    if let Err(e) = cache.attach_child(parent, child) {
                        warn!("Failed to attach discovered entry; error={}", e);
                    }
                }
            }
        }
        .boxed()
    }

    async fn fetch_bundle(&self, locator: &Locator) -> Fetched {
        if self.fetcher.uri_cache().contains(locator.as_str()) {
            debug!("Locator already fetched; uri={}", locator);
            return Fetched::AlreadySeen;
        }
        let bytes = match self.fetcher.get(locator).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("No bundle returned; uri={}", locator);
                return Fetched::Failed;
            }
            Err(_) => return Fetched::Failed,
        };
        match CertBundle::parse(&bytes) {
            Ok(bundle) => {
                debug!(
                    "Decoded bundle; uri={}, certificates={}",
                    locator,
                    bundle.len()
                );
                Fetched::Bundle(bundle.into_certificates())
            }
            Err(e) => {
                warn!("Failed to decode bundle; uri={}, error={}", locator, e);
                Fetched::Bundle(Vec::new())
            }
        }
    }

    fn accept(
        &self,
        authority: &CaEntry,
        candidate: &Certificate,
        path: &DescentPath,
        source: &str,
    ) -> bool {
        if !candidate.is_ca() {
            debug!("Skipping non-CA candidate; subject={}", candidate.subject());
            return false;
        }
        if candidate == authority.certificate() {
            return false;
        }
        if !authority.is_signer_of(candidate) {
            debug!(
                "Skipping candidate not issued by authority; subject={}, authority={}",
                candidate.subject(),
                authority.certificate().subject()
            );
            return false;
        }
        if !self.registry.is_acceptable_ca(candidate, source) {
            return false;
        }
        let key_id = KeyId::for_subject(candidate);
        self.registry
            .is_right_direction(&key_id, candidate, path, source)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_support::{issue, root, Profile, TestCa};
    use crate::transport::fake::FakeTransport;
    use crate::uri_cache::UriCache;

    fn bundle(certs: &[&TestCa]) -> Vec<u8> {
        CertBundle::from_certificates(certs.iter().map(|ca| ca.cert.clone()).collect())
            .to_certs_only_der()
            .unwrap()
    }

    fn engine(
        transport: FakeTransport,
        policy: LocatorPolicy,
    ) -> (DiscoveryEngine, Arc<RejectionRegistry>) {
        let fetcher = Fetcher::new(Arc::new(transport), Arc::new(UriCache::new()));
        let registry = Arc::new(RejectionRegistry::new());
        (
            DiscoveryEngine::new(fetcher, Arc::clone(&registry), policy),
            registry,
        )
    }

    fn children_of(cache: &TrustCache, id: EntryId) -> Vec<Certificate> {
        cache
            .children(id)
            .map(|(_, entry)| entry.certificate().clone())
            .collect()
    }

    #[test]
    fn test_descent_path_is_immutable() {
        let x = root("X", &Profile::default());
        let y = root("Y", &Profile::default());
        let base = DescentPath::from_anchor(&x.cert);
        let extended = base.with(KeyId::for_subject(&y.cert));

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert!(!base.contains(&KeyId::for_subject(&y.cert)));
        assert!(extended.contains(&KeyId::for_subject(&x.cert)));
    }

    #[tokio::test]
    async fn test_discovers_two_levels() {
        let x = root(
            "X",
            &Profile {
                sia: &["http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let y = issue(
            &x,
            "Y",
            &Profile {
                sia: &["http://repo.test/y.p7c"],
                ..Profile::default()
            },
        );
        let z = issue(&y, "Z", &Profile::default());
        let transport = FakeTransport::default()
            .serve("http://repo.test/x.p7c", 200, bundle(&[&y]))
            .serve("http://repo.test/y.p7c", 200, bundle(&[&z]));
        let (engine, registry) = engine(transport, LocatorPolicy::default());

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        let summary = engine.discover(&mut cache).await;
        cache.flatten();

        assert_eq!(summary.accepted, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(children_of(&cache, cache.root()), vec![y.cert.clone()]);
        assert!(registry.is_empty());

        let z_id = crate::cert::cert_id::CertId::new(&y.cert, &z.cert);
        let path = cache.path_to_anchor(&z_id).unwrap();
        assert_eq!(path.len(), 3);
    }

    #[tokio::test]
    async fn test_skips_non_ca_self_and_foreign_candidates() {
        let x = root(
            "X",
            &Profile {
                sia: &["http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let leaf = issue(
            &x,
            "Leaf",
            &Profile {
                not_ca: true,
                ..Profile::default()
            },
        );
        let other = root("Other", &Profile::default());
        let foreign = issue(&other, "Foreign", &Profile::default());
        let transport = FakeTransport::default().serve(
            "http://repo.test/x.p7c",
            200,
            bundle(&[&leaf, &x, &foreign]),
        );
        let (engine, registry) = engine(transport, LocatorPolicy::default());

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        let summary = engine.discover(&mut cache).await;

        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.accepted, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_expired_candidate_is_rejected() {
        let x = root(
            "X",
            &Profile {
                sia: &["http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let expired = issue(
            &x,
            "Expired",
            &Profile {
                expired: true,
                ..Profile::default()
            },
        );
        let transport =
            FakeTransport::default().serve("http://repo.test/x.p7c", 200, bundle(&[&expired]));
        let (engine, registry) = engine(transport, LocatorPolicy::default());

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        engine.discover(&mut cache).await;

        let rejections = registry.entries();
        assert_eq!(rejections.len(), 1);
        assert!(rejections[0].reason().contains("validity"));
        assert_eq!(rejections[0].source(), "http://repo.test/x.p7c");
    }

    #[tokio::test]
    async fn test_undecodable_bundle_yields_no_candidates() {
        let x = root(
            "X",
            &Profile {
                sia: &["http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let transport =
            FakeTransport::default().serve("http://repo.test/x.p7c", 200, b"garbage".to_vec());
        let (engine, _) = engine(transport, LocatorPolicy::default());

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        let summary = engine.discover(&mut cache).await;

        assert_eq!(summary.bundles, 1);
        assert_eq!(summary.candidates, 0);
    }

    async fn discover_with_dead_first_locator(policy: LocatorPolicy) -> DiscoverySummary {
        let x = root(
            "X",
            &Profile {
                sia: &["http://down.test/x.p7c", "http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let y = issue(&x, "Y", &Profile::default());
        let transport =
            FakeTransport::default().serve("http://repo.test/x.p7c", 200, bundle(&[&y]));
        let (engine, _) = engine(transport, policy);

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        engine.discover(&mut cache).await
    }

    #[tokio::test]
    async fn test_failed_locator_stops_authority_by_default() {
        let summary = discover_with_dead_first_locator(LocatorPolicy::StopOnFirstFailure).await;
        assert_eq!(summary.accepted, 0);
    }

    #[tokio::test]
    async fn test_try_all_continues_past_failed_locator() {
        let summary = discover_with_dead_first_locator(LocatorPolicy::TryAll).await;
        assert_eq!(summary.accepted, 1);
    }

    #[tokio::test]
    async fn test_later_failed_locator_does_not_stop_authority() {
        let x = root(
            "X",
            &Profile {
                sia: &[
                    "http://repo.test/a.p7c",
                    "http://down.test/b.p7c",
                    "http://repo.test/c.p7c",
                ],
                ..Profile::default()
            },
        );
        let y1 = issue(&x, "Y1", &Profile::default());
        let y2 = issue(&x, "Y2", &Profile::default());
        let transport = FakeTransport::default()
            .serve("http://repo.test/a.p7c", 200, bundle(&[&y1]))
            .serve("http://repo.test/c.p7c", 200, bundle(&[&y2]));
        let (engine, _) = engine(transport, LocatorPolicy::StopOnFirstFailure);

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        let summary = engine.discover(&mut cache).await;

        assert_eq!(summary.bundles, 2);
        assert_eq!(summary.accepted, 2);
        assert_eq!(
            children_of(&cache, cache.root()),
            vec![y1.cert.clone(), y2.cert.clone()]
        );
    }

    #[tokio::test]
    async fn test_already_fetched_locator_is_skipped() {
        let x = root(
            "X",
            &Profile {
                sia: &["http://repo.test/x.p7c"],
                ..Profile::default()
            },
        );
        let y = issue(
            &x,
            "Y",
            &Profile {
                sia: &["http://repo.test/x.p7c", "http://repo.test/y.p7c"],
                ..Profile::default()
            },
        );
        let z = issue(&y, "Z", &Profile::default());
        let transport = FakeTransport::default()
            .serve("http://repo.test/x.p7c", 200, bundle(&[&y]))
            .serve("http://repo.test/y.p7c", 200, bundle(&[&z]));
        let (engine, _) = engine(transport, LocatorPolicy::StopOnFirstFailure);

        let mut cache = TrustCache::new(x.cert.clone()).unwrap();
        let summary = engine.discover(&mut cache).await;

        assert_eq!(summary.bundles, 2);
        assert_eq!(summary.accepted, 2);
    }
}
