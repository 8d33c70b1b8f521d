//! Registry of certificates refused entry into the trust graph.
//!
//! Entries are keyed by the method-one key identifier of the certificate's public key, so
//! re-issued certificates over the same key are refused together. Nothing expires; the
//! registry is only emptied by [`RejectionRegistry::clear`].

use crate::cert::key_id::KeyId;
use crate::cert::Certificate;
use crate::discovery::DescentPath;
use crate::prelude::{debug, info};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;

/// A refused certificate and why it was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    certificate: Certificate,
    reason: String,
    source: String,
    rejected_at: OffsetDateTime,
}

impl Rejection {
    /// The refused certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Where the certificate was encountered, usually a locator URI.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// When the rejection was recorded.
    pub fn rejected_at(&self) -> OffsetDateTime {
        self.rejected_at
    }
}

/// Shared exclusion list for discovery and the validation pass.
#[derive(Debug, Default)]
pub struct RejectionRegistry {
    entries: RwLock<HashMap<KeyId, Rejection>>,
}

impl RejectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `candidate`'s key is already rejected.
    pub fn contains(&self, candidate: &Certificate) -> bool {
        let key_id = KeyId::method_one(candidate);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key_id)
    }

    /// Acceptance check at the current time. See [`RejectionRegistry::is_acceptable_ca_at`].
    pub fn is_acceptable_ca(&self, candidate: &Certificate, source: &str) -> bool {
        self.is_acceptable_ca_at(candidate, source, OffsetDateTime::now_utc())
    }

    /// Returns `false` for an already rejected key without recording anything new. Otherwise
    /// records a rejection and returns `false` if `candidate` is not valid at `instant`.
    pub fn is_acceptable_ca_at(
        &self,
        candidate: &Certificate,
        source: &str,
        instant: OffsetDateTime,
    ) -> bool {
        if self.contains(candidate) {
            debug!(
                "Candidate already rejected; subject={}, source={}",
                candidate.subject(),
                source
            );
            return false;
        }
        match candidate.check_validity_at(instant) {
            Ok(()) => true,
            Err(e) => {
                self.reject(candidate, e.to_string(), source);
                false
            }
        }
    }

    /// Returns `false`, recording a rejection the first time, if `key_id` already appears on
    /// `descent_path`.
    pub fn is_right_direction(
        &self,
        key_id: &KeyId,
        candidate: &Certificate,
        descent_path: &DescentPath,
        source: &str,
    ) -> bool {
        if descent_path.is_empty() || !descent_path.contains(key_id) {
            return true;
        }
        let reason = format!(
            "Wrong direction: key {} is already on the path from the trust anchor",
            key_id
        );
        self.insert_if_absent(candidate, reason, source);
        false
    }

    /// Records a rejection for `candidate`, replacing any previous reason for the same key.
    pub fn reject(&self, candidate: &Certificate, reason: impl Into<String>, source: &str) {
        let rejection = self.rejection(candidate, reason.into(), source);
        info!(
            "Rejected certificate; subject={}, reason={}, source={}",
            candidate.subject(),
            rejection.reason,
            source
        );
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(KeyId::method_one(candidate), rejection);
    }

    fn insert_if_absent(&self, candidate: &Certificate, reason: String, source: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let key_id = KeyId::method_one(candidate);
        if entries.contains_key(&key_id) {
            return;
        }
        info!(
            "Rejected certificate; subject={}, reason={}, source={}",
            candidate.subject(),
            reason,
            source
        );
        let rejection = self.rejection(candidate, reason, source);
        entries.insert(key_id, rejection);
    }

    fn rejection(&self, candidate: &Certificate, reason: String, source: &str) -> Rejection {
        Rejection {
            certificate: candidate.clone(),
            reason,
            source: source.to_string(),
            rejected_at: OffsetDateTime::now_utc(),
        }
    }

    /// Snapshot of all rejections, oldest first.
    pub fn entries(&self) -> Vec<Rejection> {
        let mut entries: Vec<Rejection> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by_key(|rejection| rejection.rejected_at);
        entries
    }

    /// Number of rejected keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been rejected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every rejection.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue, root, Profile};

    #[test]
    fn test_expired_candidate_is_rejected_once() {
        let x = root("X", &Profile::default());
        let expired = issue(
            &x,
            "Expired",
            &Profile {
                expired: true,
                ..Profile::default()
            },
        );
        let registry = RejectionRegistry::new();

        assert!(!registry.is_acceptable_ca(&expired.cert, "http://repo.test/x.p7c"));
        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].reason().contains("validity"));
        assert_eq!(entries[0].source(), "http://repo.test/x.p7c");

        assert!(!registry.is_acceptable_ca(&expired.cert, "elsewhere"));
        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source(), "http://repo.test/x.p7c");
    }

    #[test]
    fn test_valid_candidate_is_acceptable() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &Profile::default());
        let registry = RejectionRegistry::new();

        assert!(registry.is_acceptable_ca(&y.cert, "test"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_direction_check_records_exactly_one_rejection() {
        let x = root("X", &Profile::default());
        let key_id = KeyId::for_subject(&x.cert);
        let path = DescentPath::default().with(key_id.clone());
        let registry = RejectionRegistry::new();

        assert!(!registry.is_right_direction(&key_id, &x.cert, &path, "http://repo.test/z.p7c"));
        assert!(!registry.is_right_direction(&key_id, &x.cert, &path, "http://repo.test/z.p7c"));
        assert_eq!(registry.len(), 1);
        assert!(registry.entries()[0].reason().contains("Wrong direction"));
    }

    #[test]
    fn test_empty_descent_path_is_always_right_direction() {
        let x = root("X", &Profile::default());
        let registry = RejectionRegistry::new();
        let key_id = KeyId::for_subject(&x.cert);

        assert!(registry.is_right_direction(&key_id, &x.cert, &DescentPath::default(), "test"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_forgets_rejections() {
        let x = root("X", &Profile::default());
        let registry = RejectionRegistry::new();
        registry.reject(&x.cert, "test", "test");
        assert!(registry.contains(&x.cert));

        registry.clear();
        assert!(!registry.contains(&x.cert));
    }
}
