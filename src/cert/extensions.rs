//! Owned views of the certificate extensions the trust cache acts on.

/// Basic constraints (`2.5.29.19`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    /// The CA flag.
    pub ca: bool,
    /// The `pathLenConstraint`, if present.
    pub path_len: Option<u32>,
}

/// The key usage bits the validator checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsage {
    /// `digitalSignature`
    pub digital_signature: bool,
    /// `keyCertSign`
    pub key_cert_sign: bool,
    /// `cRLSign`
    pub crl_sign: bool,
}

/// A policy qualifier carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyQualifier {
    /// Qualifier id in dotted form.
    pub id: String,
    /// DER of the qualifier value.
    pub value: Vec<u8>,
}

/// One `PolicyInformation` from a certificate policies extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInformation {
    /// Policy OID in dotted form.
    pub policy_id: String,
    /// Qualifiers attached to the policy.
    pub qualifiers: Vec<PolicyQualifier>,
}

/// The certificate policies extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificatePolicies {
    /// Whether the extension was marked critical.
    pub critical: bool,
    /// Policies in certificate order.
    pub policies: Vec<PolicyInformation>,
}

/// Policy mapping (`issuerDomainPolicy` → `subjectDomainPolicy`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyMapping {
    /// Issuer domain policy.
    pub issuer_domain_policy: String,
    /// Subject domain policy.
    pub subject_domain_policy: String,
}

/// Policy constraints (`2.5.29.36`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyConstraints {
    /// `requireExplicitPolicy` skip count.
    pub require_explicit_policy: Option<u32>,
    /// `inhibitPolicyMapping` skip count.
    pub inhibit_policy_mapping: Option<u32>,
}

/// URIs published by a certificate's access and distribution extensions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locators {
    /// AIA `id-ad-ocsp`.
    pub ocsp: Vec<String>,
    /// AIA `id-ad-caIssuers`.
    pub ca_issuers: Vec<String>,
    /// SIA `id-ad-caRepository`.
    pub ca_repository: Vec<String>,
    /// CDP `fullName` and `cRLIssuer` URIs.
    pub crl_distribution_points: Vec<String>,
}

/// Extended key usage purposes the trust cache acts on (`2.5.29.37`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedKeyUsage {
    /// `anyExtendedKeyUsage`
    pub any: bool,
    /// `id-kp-OCSPSigning`
    pub ocsp_signing: bool,
}

/// A `GeneralName` in the forms name constraints are evaluated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneralName {
    /// `rfc822Name`
    Email(String),
    /// `dNSName`
    Dns(String),
    /// `directoryName`, kept as the DER of the `Name`.
    Directory(Vec<u8>),
    /// `uniformResourceIdentifier`
    Uri(String),
    /// `iPAddress`: 4 or 16 octets in a name, address followed by mask in a constraint.
    Ip(Vec<u8>),
    /// Any other form, by its `GeneralName` tag number.
    Other(u8),
}

impl GeneralName {
    /// The `GeneralName` CHOICE tag of this form.
    pub fn form(&self) -> u8 {
        match self {
            GeneralName::Email(_) => 1,
            GeneralName::Dns(_) => 2,
            GeneralName::Directory(_) => 4,
            GeneralName::Uri(_) => 6,
            GeneralName::Ip(_) => 7,
            GeneralName::Other(tag) => *tag,
        }
    }
}

/// Name constraints (`2.5.29.30`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameConstraints {
    /// `permittedSubtrees` bases; empty when the field is absent.
    pub permitted: Vec<GeneralName>,
    /// `excludedSubtrees` bases.
    pub excluded: Vec<GeneralName>,
}
