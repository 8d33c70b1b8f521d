//! Certificate revocation lists.

use crate::cert::error::CertificateError;
use crate::cert::parsing::{nom_to_error, parse_der_encoded_bytes_as_x509_certificate, timestamp};
use crate::cert::{Certificate, Name};
use num_bigint::BigInt;
use std::collections::HashSet;
use std::fmt;
use time::OffsetDateTime;

/// A decoded X.509 CRL.
#[derive(Clone)]
pub struct Crl {
    der: Vec<u8>,
    issuer: Name,
    this_update: OffsetDateTime,
    next_update: Option<OffsetDateTime>,
    revoked: HashSet<BigInt>,
}

impl Crl {
    /// Decodes a DER or PEM (`X509 CRL`) encoded CRL.
    ///
    /// # Errors
    /// Returns a [`CertificateError`] if the bytes are not a CRL.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        if bytes.starts_with(b"-----BEGIN") {
            let block = pem::parse(bytes).map_err(|e| CertificateError::Pem(e.to_string()))?;
            return Self::from_der(block.contents());
        }
        Self::from_der(bytes)
    }

    /// Decodes a DER CRL.
    ///
    /// # Errors
    /// Returns a [`CertificateError`] if the bytes are not a CRL.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, crl) = x509_parser::parse_x509_crl(der).map_err(nom_to_error)?;
        let revoked = crl
            .iter_revoked_certificates()
            .map(|entry| BigInt::from_signed_bytes_be(entry.raw_serial()))
            .collect();
        Ok(Self {
            der: der.to_vec(),
            issuer: Name::new(crl.issuer().as_raw().to_vec(), crl.issuer().to_string()),
            this_update: timestamp(crl.last_update().timestamp())?,
            next_update: crl
                .next_update()
                .map(|t| timestamp(t.timestamp()))
                .transpose()?,
            revoked,
        })
    }

    /// DER bytes of the CRL.
    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    /// CRL issuer name.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// `thisUpdate`.
    pub fn this_update(&self) -> OffsetDateTime {
        self.this_update
    }

    /// `nextUpdate`, if present.
    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.next_update
    }

    /// Returns `true` if the CRL is usable at `instant`.
    pub fn is_current_at(&self, instant: OffsetDateTime) -> bool {
        self.this_update <= instant && self.next_update.map_or(true, |next| instant <= next)
    }

    /// Returns `true` if `cert`'s serial is listed.
    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        self.revoked.contains(cert.serial())
    }

    /// Number of revoked entries.
    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Verifies the CRL signature with `issuer`'s public key.
    ///
    /// # Errors
    /// Returns [`CertificateError::ParseX509`] carrying the verification failure.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<(), CertificateError> {
        let (_, crl) = x509_parser::parse_x509_crl(&self.der).map_err(nom_to_error)?;
        let signer = parse_der_encoded_bytes_as_x509_certificate(issuer.as_bytes())?;
        crl.verify_signature(signer.public_key())?;
        Ok(())
    }
}

impl fmt::Debug for Crl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crl")
            .field("issuer", &self.issuer.to_string())
            .field("this_update", &self.this_update)
            .field("next_update", &self.next_update)
            .field("revoked", &self.revoked.len())
            .finish()
    }
}
