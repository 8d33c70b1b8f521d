//! Certificate identifiers (RFC 6960 `CertID`, SHA-1).
//!
//! A `CertId` names a certificate relative to its issuer: hash of the issuer's name, hash of
//! the issuer's public key, and the certificate serial number. It is the key of the flattened
//! trust cache and is exchanged with clients as url-safe base64 of its DER encoding.

use crate::cert::der::{algorithm_identifier, decode_sequence, is_oid};
use crate::cert::error::CertificateError;
use crate::cert::key_id::sha1;
use crate::cert::Certificate;
use crate::constants::oid;
use asn1::ASN1Block;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use num_bigint::BigInt;
use std::fmt;

/// Identifier of a certificate relative to its issuer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CertId {
    issuer_name_hash: Vec<u8>,
    issuer_key_hash: Vec<u8>,
    serial: BigInt,
}

impl CertId {
    /// Computes the identifier of `subject` as issued by `issuer`.
    pub fn new(issuer: &Certificate, subject: &Certificate) -> Self {
        Self {
            issuer_name_hash: sha1(issuer.subject().as_raw()).to_vec(),
            issuer_key_hash: sha1(&issuer.public_key().key_bits).to_vec(),
            serial: subject.serial().clone(),
        }
    }

    /// SHA-1 of the issuer's distinguished name.
    pub fn issuer_name_hash(&self) -> &[u8] {
        &self.issuer_name_hash
    }

    /// SHA-1 of the issuer's public key.
    pub fn issuer_key_hash(&self) -> &[u8] {
        &self.issuer_key_hash
    }

    /// Serial number of the identified certificate.
    pub fn serial(&self) -> &BigInt {
        &self.serial
    }

    pub(crate) fn to_asn1(&self) -> Result<ASN1Block, CertificateError> {
        Ok(ASN1Block::Sequence(
            0,
            vec![
                algorithm_identifier(oid::SHA1, true)?,
                ASN1Block::OctetString(0, self.issuer_name_hash.clone()),
                ASN1Block::OctetString(0, self.issuer_key_hash.clone()),
                ASN1Block::Integer(0, self.serial.clone()),
            ],
        ))
    }

    pub(crate) fn from_asn1(items: &[ASN1Block]) -> Result<Self, CertificateError> {
        match items {
            [ASN1Block::Sequence(_, algorithm), ASN1Block::OctetString(_, name_hash), ASN1Block::OctetString(_, key_hash), ASN1Block::Integer(_, serial)] =>
            {
                if !algorithm.first().is_some_and(|o| is_oid(o, oid::SHA1)) {
                    return Err(CertificateError::Malformed("CertID hash algorithm"));
                }
                Ok(Self {
                    issuer_name_hash: name_hash.clone(),
                    issuer_key_hash: key_hash.clone(),
                    serial: serial.clone(),
                })
            }
            _ => Err(CertificateError::Malformed("CertID")),
        }
    }

    /// DER encoding of the `CertID` structure.
    ///
    /// # Errors
    /// Returns [`CertificateError::DerEncode`] if encoding fails.
    pub fn to_der(&self) -> Result<Vec<u8>, CertificateError> {
        Ok(asn1::to_der(&self.to_asn1()?)?)
    }

    /// Decodes a DER `CertID`.
    ///
    /// # Errors
    /// Fails if the input is not a SHA-1 `CertID`.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        Self::from_asn1(&decode_sequence(der)?)
    }

    /// Url-safe base64 (unpadded) of the DER encoding.
    ///
    /// # Errors
    /// Returns [`CertificateError::DerEncode`] if encoding fails.
    pub fn to_url_safe_base64(&self) -> Result<String, CertificateError> {
        Ok(URL_SAFE_NO_PAD.encode(self.to_der()?))
    }

    /// Decodes url-safe or standard base64, with or without padding.
    ///
    /// # Errors
    /// Returns [`CertificateError::Base64`] or a DER decoding error.
    pub fn from_url_safe_base64(encoded: &str) -> Result<Self, CertificateError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        let der = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
            .map_err(|e| CertificateError::Base64(e.to_string()))?;
        Self::from_der(&der)
    }
}

impl fmt::Debug for CertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertId")
            .field("issuer_name_hash", &hex::encode(&self.issuer_name_hash))
            .field("issuer_key_hash", &hex::encode(&self.issuer_key_hash))
            .field("serial", &self.serial.to_str_radix(16))
            .finish()
    }
}

impl fmt::Display for CertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(&self.issuer_name_hash),
            hex::encode(&self.issuer_key_hash),
            self.serial.to_str_radix(16)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CertId {
        CertId {
            issuer_name_hash: vec![1; 20],
            issuer_key_hash: vec![2; 20],
            serial: BigInt::from(0x8f00_u32),
        }
    }

    #[test]
    fn test_base64_form_decodes_back_to_same_id() {
        let id = sample();
        let encoded = id.to_url_safe_base64().unwrap();
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));
        assert_eq!(CertId::from_url_safe_base64(&encoded).unwrap(), id);
    }

    #[test]
    fn test_from_base64_accepts_padded_standard_alphabet() {
        let id = sample();
        let standard = base64::engine::general_purpose::STANDARD.encode(id.to_der().unwrap());
        assert_eq!(CertId::from_url_safe_base64(&standard).unwrap(), id);
    }

    #[test]
    fn test_from_der_rejects_other_hash_algorithms() {
        let block = ASN1Block::Sequence(
            0,
            vec![
                algorithm_identifier("2.16.840.1.101.3.4.2.1", true).unwrap(),
                ASN1Block::OctetString(0, vec![1; 32]),
                ASN1Block::OctetString(0, vec![2; 32]),
                ASN1Block::Integer(0, BigInt::from(1)),
            ],
        );
        let der = asn1::to_der(&block).unwrap();
        assert!(matches!(
            CertId::from_der(&der),
            Err(CertificateError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        assert!(matches!(
            CertId::from_url_safe_base64("!!!"),
            Err(CertificateError::Base64(_))
        ));
    }
}
