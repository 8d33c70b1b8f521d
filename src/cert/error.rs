//! Error types for certificate, CRL and identifier decoding.

use asn1::{ASN1DecodeErr, ASN1EncodeErr};
use x509_parser::error::X509Error;

/// An error that may arise parsing or verifying X.509 material.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// Error returned by the X.509 parsing library.
    #[error("failed parsing X.509 structure: {0}")]
    ParseX509(#[from] X509Error),

    /// Error returned by the ASN.1/DER decoder.
    #[error("failed decoding DER: {0}")]
    DerDecode(#[from] ASN1DecodeErr),

    /// Error returned by the ASN.1/DER encoder.
    #[error("failed encoding DER: {0}")]
    DerEncode(#[from] ASN1EncodeErr),

    /// The DER structure decoded but did not have the expected shape.
    #[error("malformed {0}")]
    Malformed(&'static str),

    /// A time field could not be represented.
    #[error("invalid time value: {0}")]
    InvalidTime(i64),

    /// Input was PEM but could not be decoded.
    #[error("failed decoding PEM: {0}")]
    Pem(String),

    /// Input was not valid base64.
    #[error("failed decoding base64: {0}")]
    Base64(String),

    /// The signature algorithm/key combination is not supported.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    /// A signature did not verify.
    #[error("signature verification failed")]
    InvalidSignature,
}

/// A certificate is outside its validity period.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum ValidityError {
    /// The certificate expired.
    #[error("certificate validity check failed: expired on {not_after}")]
    Expired {
        /// End of the validity period.
        not_after: time::OffsetDateTime,
    },

    /// The certificate is not valid yet.
    #[error("certificate validity check failed: not valid before {not_before}")]
    NotYetValid {
        /// Start of the validity period.
        not_before: time::OffsetDateTime,
    },
}
