//! Signature verification over raw signed data, for structures the X.509 parser
//! does not model (OCSP basic responses).

use crate::cert::error::CertificateError;
use crate::cert::PublicKeyInfo;
use crate::constants::oid;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};

fn verification_algorithm(
    signature_algorithm: &str,
    key: &PublicKeyInfo,
) -> Option<&'static dyn VerificationAlgorithm> {
    let algorithm: &'static dyn VerificationAlgorithm =
        match (signature_algorithm, key.algorithm.as_str(), key.curve.as_deref()) {
            (oid::SHA1_WITH_RSA, oid::RSA_ENCRYPTION, _) => {
                &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
            }
            (oid::SHA256_WITH_RSA, oid::RSA_ENCRYPTION, _) => {
                &signature::RSA_PKCS1_2048_8192_SHA256
            }
            (oid::SHA384_WITH_RSA, oid::RSA_ENCRYPTION, _) => {
                &signature::RSA_PKCS1_2048_8192_SHA384
            }
            (oid::SHA512_WITH_RSA, oid::RSA_ENCRYPTION, _) => {
                &signature::RSA_PKCS1_2048_8192_SHA512
            }
            (oid::ECDSA_WITH_SHA256, oid::EC_PUBLIC_KEY, Some(oid::SECP256R1)) => {
                &signature::ECDSA_P256_SHA256_ASN1
            }
            (oid::ECDSA_WITH_SHA384, oid::EC_PUBLIC_KEY, Some(oid::SECP256R1)) => {
                &signature::ECDSA_P256_SHA384_ASN1
            }
            (oid::ECDSA_WITH_SHA256, oid::EC_PUBLIC_KEY, Some(oid::SECP384R1)) => {
                &signature::ECDSA_P384_SHA256_ASN1
            }
            (oid::ECDSA_WITH_SHA384, oid::EC_PUBLIC_KEY, Some(oid::SECP384R1)) => {
                &signature::ECDSA_P384_SHA384_ASN1
            }
            (oid::ED25519, oid::ED25519, _) => &signature::ED25519,
            _ => return None,
        };
    Some(algorithm)
}

/// Verifies `signature` over `message` with `key`, using the algorithm named by
/// `signature_algorithm` (dotted OID).
///
/// # Errors
/// - [`CertificateError::UnsupportedSignatureAlgorithm`] for algorithm/key combinations
///   outside RSA PKCS#1, ECDSA P-256/P-384 and Ed25519.
/// - [`CertificateError::InvalidSignature`] if the signature does not verify.
pub(crate) fn verify_signed_data(
    key: &PublicKeyInfo,
    signature_algorithm: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CertificateError> {
    let algorithm = verification_algorithm(signature_algorithm, key).ok_or_else(|| {
        CertificateError::UnsupportedSignatureAlgorithm(signature_algorithm.to_string())
    })?;
    UnparsedPublicKey::new(algorithm, &key.key_bits)
        .verify(message, signature)
        .map_err(|_| CertificateError::InvalidSignature)
}
