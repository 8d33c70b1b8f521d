//! Certificate bundles published at SIA `caRepository` and AIA `caIssuers` locators.
//!
//! Repositories publish a certs-only CMS `SignedData` (`.p7c`). PEM documents and bare
//! concatenated DER are accepted as well since some repositories serve them.

use crate::cert::der::{tlv_is_oid, Tlv};
use crate::cert::error::CertificateError;
use crate::cert::parsing::to_certificate_vec_unbounded;
use crate::cert::Certificate;
use crate::constants::oid;
use asn1::{ASN1Block, ASN1Class};
use num_bigint::{BigInt, BigUint};

/// An ordered collection of certificates decoded from a published bundle.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CertBundle {
    certificates: Vec<Certificate>,
}

/// An error that can arise decoding a [`CertBundle`].
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum BundleError {
    /// A certificate inside the bundle could not be parsed.
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// The bytes are neither PEM, certs-only CMS, nor DER certificates.
    #[error("unrecognized bundle encoding")]
    UnrecognizedEncoding,

    /// The CMS structure is not a certs-only `SignedData`.
    #[error("malformed certs-only bundle: {0}")]
    Malformed(&'static str),
}

impl CertBundle {
    /// Creates a bundle from already parsed certificates.
    pub fn from_certificates(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    /// Decodes a published bundle.
    ///
    /// # Errors
    ///
    /// Returns a [`BundleError`] if no supported encoding yields certificates.
    pub fn parse(bytes: &[u8]) -> Result<Self, BundleError> {
        if looks_like_pem(bytes) {
            return Self::parse_pem(bytes);
        }
        match parse_certs_only(bytes) {
            Ok(certificates) => Ok(Self { certificates }),
            Err(cms_err) => match to_certificate_vec_unbounded(bytes) {
                Ok(certificates) if !certificates.is_empty() => Ok(Self { certificates }),
                _ => Err(cms_err),
            },
        }
    }

    fn parse_pem(bytes: &[u8]) -> Result<Self, BundleError> {
        let blocks = pem::parse_many(bytes).map_err(|_| BundleError::UnrecognizedEncoding)?;
        let mut certificates = Vec::new();
        for block in &blocks {
            match block.tag() {
                "CERTIFICATE" => certificates.push(Certificate::try_from(block.contents())?),
                "PKCS7" | "CMS" => certificates.extend(parse_certs_only(block.contents())?),
                _ => {}
            }
        }
        Ok(Self { certificates })
    }

    /// Returns the certificates in the bundle.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Consumes the bundle, returning its certificates.
    pub fn into_certificates(self) -> Vec<Certificate> {
        self.certificates
    }

    /// Number of certificates in the bundle.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Returns `true` if the bundle has no certificates.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Encodes the bundle as a DER certs-only CMS `SignedData`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Certificate`] if the DER encoder fails.
    pub fn to_certs_only_der(&self) -> Result<Vec<u8>, BundleError> {
        let certificates: Vec<u8> = self
            .certificates
            .iter()
            .flat_map(|cert| cert.as_bytes().iter().copied())
            .collect();

        let signed_data = ASN1Block::Sequence(
            0,
            vec![
                ASN1Block::Integer(0, BigInt::from(1)),
                ASN1Block::Set(0, Vec::new()),
                ASN1Block::Sequence(0, vec![object_identifier(oid::PKCS7_DATA)?]),
                ASN1Block::Unknown(
                    ASN1Class::ContextSpecific,
                    true,
                    0,
                    BigUint::from(0u8),
                    certificates,
                ),
                ASN1Block::Set(0, Vec::new()),
            ],
        );
        let content_info = ASN1Block::Sequence(
            0,
            vec![
                object_identifier(oid::PKCS7_SIGNED_DATA)?,
                ASN1Block::Explicit(
                    ASN1Class::ContextSpecific,
                    0,
                    BigUint::from(0u8),
                    Box::new(signed_data),
                ),
            ],
        );
        asn1::to_der(&content_info).map_err(|e| BundleError::Certificate(e.into()))
    }
}

impl IntoIterator for CertBundle {
    type Item = Certificate;
    type IntoIter = std::vec::IntoIter<Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.into_iter()
    }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    let trimmed = bytes.trim_ascii_start();
    trimmed.starts_with(b"-----BEGIN")
}

fn object_identifier(dotted: &str) -> Result<ASN1Block, BundleError> {
    Ok(ASN1Block::ObjectIdentifier(
        0,
        crate::cert::der::oid_from_str(dotted)?,
    ))
}

/// Decodes `ContentInfo { signedData, [0] SignedData }` and returns its `certificates`.
fn parse_certs_only(input: &[u8]) -> Result<Vec<Certificate>, BundleError> {
    let content_info = Tlv::single(input).map_err(|_| BundleError::UnrecognizedEncoding)?;
    if !content_info.is_sequence() {
        return Err(BundleError::UnrecognizedEncoding);
    }
    let (content_type, content) = match content_info.children()?.as_slice() {
        [content_type, content] => (*content_type, *content),
        _ => return Err(BundleError::Malformed("content info")),
    };
    if !tlv_is_oid(&content_type, oid::PKCS7_SIGNED_DATA) {
        return Err(BundleError::Malformed("content type is not signed data"));
    }
    if content.context_tag() != Some(0) {
        return Err(BundleError::Malformed("content"));
    }
    let signed_data = match content.children()?.as_slice() {
        [signed_data] if signed_data.is_sequence() => *signed_data,
        _ => return Err(BundleError::Malformed("signed data")),
    };

    // version, digestAlgorithms, encapContentInfo, then the optional [0] certificates.
    let Some(certificates) = signed_data
        .children()?
        .into_iter()
        .find(|field| field.context_tag() == Some(0))
    else {
        return Ok(Vec::new());
    };
    Ok(to_certificate_vec_unbounded(certificates.contents())?)
}
