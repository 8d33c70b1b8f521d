//! Internal parsing helpers.

use crate::cert::der::{context_tag, decode_sequence, is_oid, oid_to_string};
use crate::cert::error::CertificateError;
use crate::cert::extensions::{
    self, BasicConstraints, CertificatePolicies, ExtendedKeyUsage, KeyUsage, Locators,
    NameConstraints, PolicyConstraints, PolicyInformation, PolicyMapping, PolicyQualifier,
};
use crate::cert::{Certificate, Name, Profile, PublicKeyInfo};
use crate::constants::oid;
use asn1::ASN1Block;
use num_bigint::BigInt;
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::extensions::{
    DistributionPointName, GeneralName, GeneralSubtree, ParsedExtension,
};
use x509_parser::nom::Err;

/// Maximum number of certificates accepted in a single chain.
///
/// Paths are bounded by the validator's maximum path length; anything past this is not a chain.
const MAX_CERT_CHAIN_LENGTH: usize = 32;

/// Takes a concatenated chain of DER-encoded certificates and parses it
/// into a `Vec<Certificate>`, refusing more than [`MAX_CERT_CHAIN_LENGTH`] entries.
pub(crate) fn to_certificate_vec(
    cert_chain_der: &[u8],
) -> Result<Vec<Certificate>, CertificateError> {
    let certs = split_der_certificates(cert_chain_der, Some(MAX_CERT_CHAIN_LENGTH))?;
    certs.into_iter().map(Certificate::try_from).collect()
}

/// Splits a concatenated list of DER certificates without a length limit.
///
/// Used for published bundles, which may legitimately carry many certificates. Callers bound
/// the input size instead.
pub(crate) fn to_certificate_vec_unbounded(
    cert_list_der: &[u8],
) -> Result<Vec<Certificate>, CertificateError> {
    let certs = split_der_certificates(cert_list_der, None)?;
    certs.into_iter().map(Certificate::try_from).collect()
}

fn split_der_certificates(
    mut rest: &[u8],
    max: Option<usize>,
) -> Result<Vec<&[u8]>, CertificateError> {
    let mut certs = Vec::new();
    while !rest.is_empty() {
        if max.is_some_and(|max| certs.len() >= max) {
            return Err(CertificateError::Malformed("certificate chain (too long)"));
        }
        let (new_rest, _cert) = x509_parser::parse_x509_certificate(rest).map_err(nom_to_error)?;

        // Slice the original input so the stored bytes are exactly what was published.
        let cert_len = rest.len() - new_rest.len();
        certs.push(&rest[..cert_len]);
        rest = new_rest;
    }
    Ok(certs)
}

/// Parses the given DER-encoded bytes as an X.509 certificate.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    match x509_parser::parse_x509_certificate(der_bytes) {
        Ok((_, cert)) => Ok(cert),
        Err(e) => Err(nom_to_error(e)),
    }
}

pub(crate) fn nom_to_error(e: Err<X509Error>) -> CertificateError {
    match e {
        Err::Incomplete(_) => CertificateError::ParseX509(X509Error::InvalidCertificate),
        Err::Error(err) | Err::Failure(err) => CertificateError::ParseX509(err),
    }
}

pub(crate) fn timestamp(ts: i64) -> Result<OffsetDateTime, CertificateError> {
    OffsetDateTime::from_unix_timestamp(ts).map_err(|_| CertificateError::InvalidTime(ts))
}

/// Builds the owned profile of a parsed certificate.
pub(crate) fn extract_profile(x509: &X509Certificate<'_>) -> Result<Profile, CertificateError> {
    let mut profile = Profile {
        subject: Name::new(x509.subject().as_raw().to_vec(), x509.subject().to_string()),
        issuer: Name::new(x509.issuer().as_raw().to_vec(), x509.issuer().to_string()),
        serial: BigInt::from_signed_bytes_be(x509.raw_serial()),
        not_before: timestamp(x509.validity().not_before.timestamp())?,
        not_after: timestamp(x509.validity().not_after.timestamp())?,
        public_key: parse_public_key_info(x509.public_key().raw)?,
        signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
        basic_constraints: None,
        key_usage: None,
        extended_key_usage: None,
        subject_key_id: None,
        authority_key_id: None,
        locators: Locators::default(),
        policies: None,
        policy_mappings: None,
        policy_constraints: None,
        inhibit_any_policy: None,
        subject_alt_names: Vec::new(),
        subject_emails: x509
            .subject()
            .iter_email()
            .filter_map(|attr| attr.as_str().ok())
            .map(str::to_string)
            .collect(),
        name_constraints: None,
        critical_extensions: Vec::new(),
    };

    for ext in x509.extensions() {
        let ext_oid = ext.oid.to_id_string();
        if ext.critical {
            profile.critical_extensions.push(ext_oid.clone());
        }
        if ext_oid == oid::SUBJECT_INFO_ACCESS {
            profile.locators.ca_repository = parse_sia_ca_repository(ext.value)?;
            continue;
        }
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => {
                profile.basic_constraints = Some(BasicConstraints {
                    ca: bc.ca,
                    path_len: bc.path_len_constraint,
                });
            }
            ParsedExtension::KeyUsage(ku) => {
                profile.key_usage = Some(KeyUsage {
                    digital_signature: ku.digital_signature(),
                    key_cert_sign: ku.key_cert_sign(),
                    crl_sign: ku.crl_sign(),
                });
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                profile.extended_key_usage = Some(ExtendedKeyUsage {
                    any: eku.any,
                    ocsp_signing: eku.ocsp_signing,
                });
            }
            ParsedExtension::SubjectAlternativeName(san) => {
                profile.subject_alt_names = san.general_names.iter().map(owned_name).collect();
            }
            ParsedExtension::NameConstraints(nc) => {
                profile.name_constraints = Some(NameConstraints {
                    permitted: subtree_bases(nc.permitted_subtrees.as_deref()),
                    excluded: subtree_bases(nc.excluded_subtrees.as_deref()),
                });
            }
            ParsedExtension::SubjectKeyIdentifier(kid) => {
                profile.subject_key_id = Some(kid.0.to_vec());
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                profile.authority_key_id = aki.key_identifier.as_ref().map(|kid| kid.0.to_vec());
            }
            ParsedExtension::AuthorityInfoAccess(aia) => {
                for desc in &aia.accessdescs {
                    let GeneralName::URI(uri) = &desc.access_location else {
                        continue;
                    };
                    match desc.access_method.to_id_string().as_str() {
                        oid::AD_OCSP => profile.locators.ocsp.push(uri.to_string()),
                        oid::AD_CA_ISSUERS => profile.locators.ca_issuers.push(uri.to_string()),
                        _ => {}
                    }
                }
            }
            ParsedExtension::CRLDistributionPoints(cdp) => {
                for point in &cdp.points {
                    if let Some(DistributionPointName::FullName(names)) = &point.distribution_point
                    {
                        push_uris(&mut profile.locators.crl_distribution_points, names);
                    }
                    if let Some(issuers) = &point.crl_issuer {
                        push_uris(&mut profile.locators.crl_distribution_points, issuers);
                    }
                }
            }
            ParsedExtension::CertificatePolicies(policies) => {
                let policies = policies
                    .iter()
                    .map(|info| PolicyInformation {
                        policy_id: info.policy_id.to_id_string(),
                        qualifiers: info
                            .policy_qualifiers
                            .iter()
                            .flatten()
                            .map(|q| PolicyQualifier {
                                id: q.policy_qualifier_id.to_id_string(),
                                value: q.qualifier.to_vec(),
                            })
                            .collect(),
                    })
                    .collect();
                profile.policies = Some(CertificatePolicies {
                    critical: ext.critical,
                    policies,
                });
            }
            ParsedExtension::PolicyMappings(mappings) => {
                profile.policy_mappings = Some(
                    mappings
                        .mappings
                        .iter()
                        .map(|m| PolicyMapping {
                            issuer_domain_policy: m.issuer_domain_policy.to_id_string(),
                            subject_domain_policy: m.subject_domain_policy.to_id_string(),
                        })
                        .collect(),
                );
            }
            ParsedExtension::PolicyConstraints(pc) => {
                profile.policy_constraints = Some(PolicyConstraints {
                    require_explicit_policy: pc.require_explicit_policy,
                    inhibit_policy_mapping: pc.inhibit_policy_mapping,
                });
            }
            ParsedExtension::InhibitAnyPolicy(iap) => {
                profile.inhibit_any_policy = Some(iap.skip_certs);
            }
            _ => {}
        }
    }

    Ok(profile)
}

fn push_uris(out: &mut Vec<String>, names: &[GeneralName<'_>]) {
    for name in names {
        if let GeneralName::URI(uri) = name {
            out.push(uri.to_string());
        }
    }
}

fn owned_name(name: &GeneralName<'_>) -> extensions::GeneralName {
    match name {
        GeneralName::OtherName(..) => extensions::GeneralName::Other(0),
        GeneralName::RFC822Name(email) => extensions::GeneralName::Email(email.to_string()),
        GeneralName::DNSName(dns) => extensions::GeneralName::Dns(dns.to_string()),
        GeneralName::X400Address(_) => extensions::GeneralName::Other(3),
        GeneralName::DirectoryName(dn) => extensions::GeneralName::Directory(dn.as_raw().to_vec()),
        GeneralName::EDIPartyName(_) => extensions::GeneralName::Other(5),
        GeneralName::URI(uri) => extensions::GeneralName::Uri(uri.to_string()),
        GeneralName::IPAddress(ip) => extensions::GeneralName::Ip(ip.to_vec()),
        GeneralName::RegisteredID(_) => extensions::GeneralName::Other(8),
    }
}

fn subtree_bases(subtrees: Option<&[GeneralSubtree<'_>]>) -> Vec<extensions::GeneralName> {
    subtrees
        .unwrap_or_default()
        .iter()
        .map(|subtree| owned_name(&subtree.base))
        .collect()
}

/// Splits a DER `SubjectPublicKeyInfo` into algorithm, curve and key bits.
pub(crate) fn parse_public_key_info(spki: &[u8]) -> Result<PublicKeyInfo, CertificateError> {
    let items = decode_sequence(spki)?;
    let (Some(ASN1Block::Sequence(_, algorithm)), Some(ASN1Block::BitString(_, _, key_bits))) =
        (items.first(), items.get(1))
    else {
        return Err(CertificateError::Malformed("subject public key info"));
    };
    let algorithm_oid = match algorithm.first() {
        Some(ASN1Block::ObjectIdentifier(_, o)) => oid_to_string(o)?,
        _ => return Err(CertificateError::Malformed("public key algorithm")),
    };
    let curve = match algorithm.get(1) {
        Some(ASN1Block::ObjectIdentifier(_, o)) => Some(oid_to_string(o)?),
        _ => None,
    };
    Ok(PublicKeyInfo {
        raw: spki.to_vec(),
        algorithm: algorithm_oid,
        curve,
        key_bits: key_bits.clone(),
    })
}

/// Extracts the `id-ad-caRepository` URIs of a subject information access extension value.
pub(crate) fn parse_sia_ca_repository(value: &[u8]) -> Result<Vec<String>, CertificateError> {
    let mut uris = Vec::new();
    for desc in decode_sequence(value)? {
        let ASN1Block::Sequence(_, parts) = desc else {
            return Err(CertificateError::Malformed("access description"));
        };
        let (Some(method), Some(location)) = (parts.first(), parts.get(1)) else {
            return Err(CertificateError::Malformed("access description"));
        };
        if !is_oid(method, oid::AD_CA_REPOSITORY) {
            continue;
        }
        // uniformResourceIdentifier [6] IA5String
        if let ASN1Block::Unknown(_, false, _, _, bytes) = location {
            if context_tag(location) == Some(6) {
                uris.push(String::from_utf8_lossy(bytes).into_owned());
            }
        }
    }
    Ok(uris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::der::{algorithm_identifier, oid_from_str};
    use asn1::ASN1Class;
    use num_bigint::BigUint;

    fn access_description(method: &str, uri: &str) -> ASN1Block {
        ASN1Block::Sequence(
            0,
            vec![
                ASN1Block::ObjectIdentifier(0, oid_from_str(method).unwrap()),
                ASN1Block::Unknown(
                    ASN1Class::ContextSpecific,
                    false,
                    0,
                    BigUint::from(6u8),
                    uri.as_bytes().to_vec(),
                ),
            ],
        )
    }

    #[test]
    fn test_parse_sia_keeps_only_ca_repository_uris() {
        let sia = asn1::to_der(&ASN1Block::Sequence(
            0,
            vec![
                access_description(oid::AD_CA_REPOSITORY, "http://repo.test/issued.p7c"),
                access_description("1.3.6.1.5.5.7.48.3", "http://tsa.test/"),
                access_description(oid::AD_CA_REPOSITORY, "ldap://ldap.test/cn=ca"),
            ],
        ))
        .unwrap();

        let uris = parse_sia_ca_repository(&sia).unwrap();
        assert_eq!(
            uris,
            vec!["http://repo.test/issued.p7c", "ldap://ldap.test/cn=ca"]
        );
    }

    #[test]
    fn test_parse_sia_rejects_non_sequence() {
        let value = asn1::to_der(&ASN1Block::Null(0)).unwrap();
        assert!(parse_sia_ca_repository(&value).is_err());
    }

    #[test]
    fn test_parse_public_key_info_reads_curve_and_bits() {
        let mut algorithm = algorithm_identifier(oid::EC_PUBLIC_KEY, false).unwrap();
        if let ASN1Block::Sequence(_, items) = &mut algorithm {
            items.push(ASN1Block::ObjectIdentifier(0, oid_from_str(oid::SECP256R1).unwrap()));
        }
        let spki = asn1::to_der(&ASN1Block::Sequence(
            0,
            vec![algorithm, ASN1Block::BitString(0, 24, vec![4, 1, 2])],
        ))
        .unwrap();

        let info = parse_public_key_info(&spki).unwrap();
        assert_eq!(info.algorithm, oid::EC_PUBLIC_KEY);
        assert_eq!(info.curve.as_deref(), Some(oid::SECP256R1));
        assert_eq!(info.key_bits, vec![4, 1, 2]);
        assert_eq!(info.raw, spki);
    }

    #[test]
    fn test_to_certificate_vec_rejects_garbage() {
        assert!(to_certificate_vec(&[0x30, 0x03, 0x01, 0x01]).is_err());
        assert!(to_certificate_vec_unbounded(&[]).unwrap().is_empty());
    }
}
