//! Certificate authority entries of the trust graph.

use crate::cache::EntryId;
use crate::cert::cert_id::CertId;
use crate::cert::key_id::KeyId;
use crate::cert::Certificate;
use crate::locator::{http_locators, Locator, LocatorKind};
use crate::policy::PolicyOutcome;

/// One authority in the trust graph.
///
/// The subject id identifies this certificate relative to its issuer; the issuer id is the
/// subject id of the issuing entry. Only the anchor has both equal.
#[derive(Debug, Clone)]
pub struct CaEntry {
    certificate: Certificate,
    subject_id: CertId,
    issuer_id: CertId,
    key_id: KeyId,
    ocsp: Vec<Locator>,
    crl_distribution_points: Vec<Locator>,
    ca_repositories: Vec<Locator>,
    policy: Option<PolicyOutcome>,
    children: Vec<EntryId>,
}

impl CaEntry {
    /// Creates an entry for `certificate`.
    pub fn new(certificate: Certificate, issuer_id: CertId, subject_id: CertId) -> Self {
        let locators = certificate.locators();
        let ocsp = http_locators(&locators.ocsp, LocatorKind::Ocsp);
        let crl_distribution_points =
            http_locators(&locators.crl_distribution_points, LocatorKind::CrlDistributionPoint);
        let ca_repositories = http_locators(&locators.ca_repository, LocatorKind::CaRepository);
        let key_id = KeyId::for_subject(&certificate);

        Self {
            certificate,
            subject_id,
            issuer_id,
            key_id,
            ocsp,
            crl_distribution_points,
            ca_repositories,
            policy: None,
            children: Vec::new(),
        }
    }

    /// Creates the entry of a self-signed anchor.
    pub fn anchor(certificate: Certificate) -> Self {
        let id = CertId::new(&certificate, &certificate);
        Self::new(certificate, id.clone(), id)
    }

    /// Creates the entry of `certificate` issued by `issuer`.
    pub fn issued_by(issuer: &CaEntry, certificate: Certificate) -> Self {
        let subject_id = CertId::new(issuer.certificate(), &certificate);
        Self::new(certificate, issuer.subject_id().clone(), subject_id)
    }

    /// The authority certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Lookup key of this entry in the flattened cache.
    pub fn subject_id(&self) -> &CertId {
        &self.subject_id
    }

    /// Subject id of the issuing entry.
    pub fn issuer_id(&self) -> &CertId {
        &self.issuer_id
    }

    /// Key identifier of the subject key.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// HTTP OCSP responders from AIA.
    pub fn ocsp_locators(&self) -> &[Locator] {
        &self.ocsp
    }

    /// HTTP CRL distribution points.
    pub fn crl_locators(&self) -> &[Locator] {
        &self.crl_distribution_points
    }

    /// HTTP SIA `caRepository` locators. Empty for a leaf of the graph.
    pub fn repository_locators(&self) -> &[Locator] {
        &self.ca_repositories
    }

    /// Policy processing result of the last validation, if any.
    pub fn policy_outcome(&self) -> Option<&PolicyOutcome> {
        self.policy.as_ref()
    }

    /// Replaces the policy processing result.
    pub fn set_policy_outcome(&mut self, outcome: Option<PolicyOutcome>) {
        self.policy = outcome;
    }

    /// Child entries in attachment order.
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: EntryId) {
        self.children.push(child);
    }

    /// A copy of this entry with no children and no policy result.
    pub(crate) fn detached(&self) -> Self {
        Self {
            policy: None,
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Returns `true` if `cert` names this entry as issuer and verifies under its key.
    pub fn is_signer_of(&self, cert: &Certificate) -> bool {
        cert.issuer() == self.certificate.subject()
            && cert.verify_issued_by(&self.certificate).is_ok()
    }

    /// Returns `true` for the trust anchor.
    pub fn is_anchor(&self) -> bool {
        self.issuer_id == self.subject_id
    }
}
