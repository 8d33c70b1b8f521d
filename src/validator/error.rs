//! Path building and validation failures.

use crate::cert::error::ValidityError;
use thiserror::Error;

/// Why a certification path could not be built or did not validate.
///
/// `index` is the position in the path counted from the certificate issued by the trust
/// anchor (1) to the target (n).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathValidationError {
    /// No chain from the target to the anchor could be assembled.
    #[error("no certification path found for {subject}")]
    NoPath {
        /// Subject of the target certificate.
        subject: String,
    },

    /// The path is longer than the configured maximum.
    #[error("certification path too long: {intermediates} intermediates, maximum {max}")]
    PathTooLong {
        /// Intermediates in the path.
        intermediates: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A signature did not verify under the working public key.
    #[error("signature check failed for certificate {index} ({subject})")]
    Signature {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// A certificate is outside its validity period.
    #[error("certificate {index} ({subject}): {source}")]
    Validity {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
        /// Validity failure.
        #[source]
        source: ValidityError,
    },

    /// A CRL lists the certificate.
    #[error("certificate {index} ({subject}) has been revoked")]
    Revoked {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// No current, correctly signed CRL covers the certificate.
    #[error("Could not determine revocation status for certificate {index} ({subject})")]
    RevocationUnknown {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// The issuer name does not match the previous subject.
    #[error("issuer name of certificate {index} ({subject}) does not chain")]
    NameChaining {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// An intermediate is not a CA.
    #[error("certificate {index} ({subject}) is not a CA certificate")]
    NotCa {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// A path length constraint was exceeded.
    #[error("path length constraint exceeded at certificate {index}")]
    PathLength {
        /// Position in the path.
        index: usize,
    },

    /// Key usage of an intermediate lacks `keyCertSign`.
    #[error("key usage of certificate {index} ({subject}) does not permit certificate signing")]
    KeyCertSign {
        /// Position in the path.
        index: usize,
        /// Subject of the certificate.
        subject: String,
    },

    /// A subject name falls outside the permitted subtrees or inside an excluded one.
    #[error("name constraints reject {name} in certificate {index}")]
    NameConstraints {
        /// Position in the path.
        index: usize,
        /// The rejected name.
        name: String,
    },

    /// A critical extension is not recognised.
    #[error("unrecognized critical extension {oid} in certificate {index}")]
    UnknownCriticalExtension {
        /// Position in the path.
        index: usize,
        /// Extension OID.
        oid: String,
    },

    /// Explicit policy is required and no valid policy remains.
    #[error("policy processing failed: valid policy tree is empty and explicit policy is required (certificate {index})")]
    EmptyPolicySet {
        /// Position in the path where the check failed.
        index: usize,
    },

    /// A critical certificate policies extension carries qualifiers that were rejected.
    #[error("policy qualifiers rejected in critical certificate policies of certificate {index}")]
    PolicyQualifiersRejected {
        /// Position in the path.
        index: usize,
    },

    /// A policy mapping names `anyPolicy`.
    #[error("policy mapping of certificate {index} maps anyPolicy")]
    AnyPolicyMapping {
        /// Position in the path.
        index: usize,
    },
}
