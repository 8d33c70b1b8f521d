//! X.509 certificate model used throughout the trust cache.
//!
//! A [`Certificate`] keeps the DER it was built from together with an owned profile of the
//! fields and extensions that discovery and path processing act on. It is validated at
//! construction and cheap to clone.

use crate::cert::error::{CertificateError, ValidityError};
use crate::cert::extensions::{
    BasicConstraints, CertificatePolicies, ExtendedKeyUsage, GeneralName, KeyUsage, Locators,
    NameConstraints, PolicyConstraints, PolicyMapping,
};
use crate::cert::parsing::{parse_der_encoded_bytes_as_x509_certificate, to_certificate_vec};
use num_bigint::BigInt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use time::OffsetDateTime;

pub mod cert_id;
pub mod crl;
pub(crate) mod der;
pub mod error;
pub mod extensions;
pub mod key_id;
pub(crate) mod parsing;
pub(crate) mod signature;

/// A single DER-encoded X.509 certificate plus its decoded profile.
///
/// Invariant: instances are always parseable DER-encoded X.509. Equality and hashing use
/// the DER bytes.
#[derive(Clone)]
pub struct Certificate {
    inner: Arc<Inner>,
}

struct Inner {
    der: Vec<u8>,
    profile: Profile,
}

pub(crate) struct Profile {
    pub(crate) subject: Name,
    pub(crate) issuer: Name,
    pub(crate) serial: BigInt,
    pub(crate) not_before: OffsetDateTime,
    pub(crate) not_after: OffsetDateTime,
    pub(crate) public_key: PublicKeyInfo,
    pub(crate) signature_algorithm: String,
    pub(crate) basic_constraints: Option<BasicConstraints>,
    pub(crate) key_usage: Option<KeyUsage>,
    pub(crate) extended_key_usage: Option<ExtendedKeyUsage>,
    pub(crate) subject_key_id: Option<Vec<u8>>,
    pub(crate) authority_key_id: Option<Vec<u8>>,
    pub(crate) locators: Locators,
    pub(crate) policies: Option<CertificatePolicies>,
    pub(crate) policy_mappings: Option<Vec<PolicyMapping>>,
    pub(crate) policy_constraints: Option<PolicyConstraints>,
    pub(crate) inhibit_any_policy: Option<u32>,
    pub(crate) subject_alt_names: Vec<GeneralName>,
    /// `emailAddress` attributes of the subject.
    pub(crate) subject_emails: Vec<String>,
    pub(crate) name_constraints: Option<NameConstraints>,
    pub(crate) critical_extensions: Vec<String>,
}

/// A distinguished name, compared by its DER encoding.
#[derive(Clone, Debug)]
pub struct Name {
    raw: Vec<u8>,
    display: String,
}

impl Name {
    pub(crate) fn new(raw: Vec<u8>, display: String) -> Self {
        Self { raw, display }
    }

    /// DER encoding of the name.
    pub fn as_raw(&self) -> &[u8] {
        &self.raw
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// `SubjectPublicKeyInfo` split into the parts signature verification needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyInfo {
    /// DER of the whole `SubjectPublicKeyInfo`.
    pub raw: Vec<u8>,
    /// Key algorithm OID.
    pub algorithm: String,
    /// Named curve OID for EC keys.
    pub curve: Option<String>,
    /// Contents of the `subjectPublicKey` BIT STRING.
    pub key_bits: Vec<u8>,
}

impl Certificate {
    /// Returns the certificate DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.der
    }

    pub(crate) fn profile(&self) -> &Profile {
        &self.inner.profile
    }

    /// Subject name.
    pub fn subject(&self) -> &Name {
        &self.inner.profile.subject
    }

    /// Issuer name.
    pub fn issuer(&self) -> &Name {
        &self.inner.profile.issuer
    }

    /// Serial number.
    pub fn serial(&self) -> &BigInt {
        &self.inner.profile.serial
    }

    /// Start of the validity period.
    pub fn not_before(&self) -> OffsetDateTime {
        self.inner.profile.not_before
    }

    /// End of the validity period.
    pub fn not_after(&self) -> OffsetDateTime {
        self.inner.profile.not_after
    }

    /// The subject public key.
    pub fn public_key(&self) -> &PublicKeyInfo {
        &self.inner.profile.public_key
    }

    /// Basic constraints, if the extension is present.
    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.inner.profile.basic_constraints
    }

    /// Returns `true` if basic constraints assert the CA flag.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints().is_some_and(|bc| bc.ca)
    }

    /// Key usage, if the extension is present.
    pub fn key_usage(&self) -> Option<KeyUsage> {
        self.inner.profile.key_usage
    }

    /// Extended key usage, if the extension is present.
    pub fn extended_key_usage(&self) -> Option<ExtendedKeyUsage> {
        self.inner.profile.extended_key_usage
    }

    /// Subject alternative names.
    pub fn subject_alt_names(&self) -> &[GeneralName] {
        &self.inner.profile.subject_alt_names
    }

    /// Name constraints, if the extension is present.
    pub fn name_constraints(&self) -> Option<&NameConstraints> {
        self.inner.profile.name_constraints.as_ref()
    }

    /// The asserted subject key identifier.
    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.inner.profile.subject_key_id.as_deref()
    }

    /// The asserted authority key identifier.
    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.inner.profile.authority_key_id.as_deref()
    }

    /// AIA, SIA and CDP URIs.
    pub fn locators(&self) -> &Locators {
        &self.inner.profile.locators
    }

    /// Certificate policies, if the extension is present.
    pub fn policies(&self) -> Option<&CertificatePolicies> {
        self.inner.profile.policies.as_ref()
    }

    /// `true` when subject and issuer names match.
    pub fn is_self_issued(&self) -> bool {
        self.subject() == self.issuer()
    }

    /// Checks `instant` against the validity period.
    ///
    /// # Errors
    /// - [`ValidityError::Expired`] when `instant` is after `notAfter`.
    /// - [`ValidityError::NotYetValid`] when `instant` is before `notBefore`.
    pub fn check_validity_at(&self, instant: OffsetDateTime) -> Result<(), ValidityError> {
        if instant > self.not_after() {
            return Err(ValidityError::Expired {
                not_after: self.not_after(),
            });
        }
        if instant < self.not_before() {
            return Err(ValidityError::NotYetValid {
                not_before: self.not_before(),
            });
        }
        Ok(())
    }

    /// Verifies this certificate's signature with `issuer`'s public key.
    ///
    /// # Errors
    /// Returns [`CertificateError::ParseX509`] carrying the verification failure.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<(), CertificateError> {
        let child = parse_der_encoded_bytes_as_x509_certificate(self.as_bytes())?;
        let parent = parse_der_encoded_bytes_as_x509_certificate(issuer.as_bytes())?;
        child.verify_signature(Some(parent.public_key()))?;
        Ok(())
    }

    /// Returns `true` if the certificate verifies under its own key.
    pub fn is_self_signed(&self) -> bool {
        parse_der_encoded_bytes_as_x509_certificate(self.as_bytes())
            .is_ok_and(|x509| x509.verify_signature(None).is_ok())
    }

    /// PEM encoding of the certificate.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.as_bytes().to_vec()))
    }

    /// Parses every `CERTIFICATE` block of a PEM document.
    ///
    /// # Errors
    /// Returns [`CertificateError::Pem`] if the document is not PEM, or a parse error for a
    /// block that is not a certificate.
    pub fn from_pem(pem_text: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
        let blocks = pem::parse_many(pem_text).map_err(|e| CertificateError::Pem(e.to_string()))?;
        blocks
            .iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| Certificate::try_from(block.contents()))
            .collect()
    }

    /// Parses a concatenation of DER certificates.
    ///
    /// # Errors
    /// Fails on the first certificate that does not parse.
    pub fn from_der_chain(der: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
        to_certificate_vec(der)
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from(der_bytes.to_vec())
    }
}

impl TryFrom<Vec<u8>> for Certificate {
    type Error = CertificateError;

    fn try_from(der: Vec<u8>) -> Result<Self, Self::Error> {
        let profile = {
            let x509 = parse_der_encoded_bytes_as_x509_certificate(&der)?;
            parsing::extract_profile(&x509)?
        };
        Ok(Self {
            inner: Arc::new(Inner { der, profile }),
        })
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.der == other.inner.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.der.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject().to_string())
            .field("issuer", &self.issuer().to_string())
            .field("serial", &self.serial().to_str_radix(16))
            .finish()
    }
}
