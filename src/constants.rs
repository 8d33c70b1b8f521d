//! Constants shared across the trust cache.

use std::time::Duration;

/// Source recorded on rejections produced by the cache validation pass.
pub const PULLED_FROM_CACHE: &str = "Pulled from Cache";

/// Default connect and overall timeout for network fetches.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` sent by the HTTP transport.
pub const DEFAULT_USER_AGENT: &str = concat!("trust-cache/", env!("CARGO_PKG_VERSION"));

/// Content type of an OCSP request body.
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Default maximum number of non-self-issued intermediates in a certification path.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 20;

/// Default upper bound on a fetched bundle or CRL body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Protocol recorded for fetches that never produced a response.
pub const NO_PROTOCOL: &str = "N/A";

pub(crate) mod oid {
    pub(crate) const ANY_POLICY: &str = "2.5.29.32.0";
    pub(crate) const SUBJECT_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.11";
    pub(crate) const AD_CA_REPOSITORY: &str = "1.3.6.1.5.5.7.48.5";
    pub(crate) const AD_OCSP: &str = "1.3.6.1.5.5.7.48.1";
    pub(crate) const AD_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";
    pub(crate) const PKCS7_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
    pub(crate) const PKCS7_DATA: &str = "1.2.840.113549.1.7.1";
    pub(crate) const SHA1: &str = "1.3.14.3.2.26";
    pub(crate) const OCSP_BASIC: &str = "1.3.6.1.5.5.7.48.1.1";
    pub(crate) const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
    pub(crate) const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
    pub(crate) const ED25519: &str = "1.3.101.112";
    pub(crate) const SECP256R1: &str = "1.2.840.10045.3.1.7";
    pub(crate) const SECP384R1: &str = "1.3.132.0.34";
    pub(crate) const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
    pub(crate) const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
    pub(crate) const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
    pub(crate) const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
    pub(crate) const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
    pub(crate) const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";

    // Extensions processed by the path validator.
    pub(crate) const BASIC_CONSTRAINTS: &str = "2.5.29.19";
    pub(crate) const KEY_USAGE: &str = "2.5.29.15";
    pub(crate) const CERTIFICATE_POLICIES: &str = "2.5.29.32";
    pub(crate) const POLICY_MAPPINGS: &str = "2.5.29.33";
    pub(crate) const POLICY_CONSTRAINTS: &str = "2.5.29.36";
    pub(crate) const INHIBIT_ANY_POLICY: &str = "2.5.29.54";
    pub(crate) const NAME_CONSTRAINTS: &str = "2.5.29.30";
    pub(crate) const SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
    pub(crate) const AUTHORITY_KEY_IDENTIFIER: &str = "2.5.29.35";
    pub(crate) const SUBJECT_ALT_NAME: &str = "2.5.29.17";
    pub(crate) const EXTENDED_KEY_USAGE: &str = "2.5.29.37";
    pub(crate) const CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";
    pub(crate) const AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";
}
