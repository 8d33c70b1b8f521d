//! Certificate fixtures for unit tests.

use crate::cert::Certificate;
use crate::cert::crl::Crl;
use asn1::{ASN1Block, ASN1Class};
use num_bigint::BigUint;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CustomExtension,
    DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyIdMethod, KeyPair,
    KeyUsagePurpose, NameConstraints, RevokedCertParams, SanType, SerialNumber,
};
use std::sync::atomic::{AtomicU32, Ordering};
use time::{Duration, OffsetDateTime};

static SERIAL: AtomicU32 = AtomicU32::new(1);

pub(crate) struct TestCa {
    pub(crate) cert: Certificate,
    pub(crate) rc: rcgen::Certificate,
    pub(crate) key: KeyPair,
}

#[derive(Default)]
pub(crate) struct Profile<'a> {
    pub(crate) sia: &'a [&'a str],
    pub(crate) crl_uris: &'a [&'a str],
    pub(crate) policies: &'a [&'a str],
    pub(crate) expired: bool,
    pub(crate) not_ca: bool,
    pub(crate) ocsp_signing: bool,
    pub(crate) dns_names: &'a [&'a str],
    pub(crate) name_constraints: Option<NameConstraints>,
}

fn params(cn: &str, profile: &Profile<'_>) -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;

    let serial = SERIAL.fetch_add(1, Ordering::SeqCst);
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&serial.to_be_bytes());
    params.serial_number = Some(SerialNumber::from_slice(&bytes));

    let now = OffsetDateTime::now_utc();
    if profile.expired {
        params.not_before = now - Duration::days(30);
        params.not_after = now - Duration::days(1);
    } else {
        params.not_before = now - Duration::days(1);
        params.not_after = now + Duration::days(365);
    }

    if !profile.not_ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
    }
    params.key_identifier_method = KeyIdMethod::Sha256;
    if profile.ocsp_signing {
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::OcspSigning];
    }
    params.subject_alt_names = profile
        .dns_names
        .iter()
        .map(|name| SanType::DnsName(name.to_string().try_into().unwrap()))
        .collect();
    params.name_constraints = profile.name_constraints.clone();

    if !profile.sia.is_empty() {
        params.custom_extensions.push(sia_extension(profile.sia));
    }
    if !profile.policies.is_empty() {
        params.custom_extensions.push(policies_extension(profile.policies));
    }
    params.crl_distribution_points = profile
        .crl_uris
        .iter()
        .map(|uri| rcgen::CrlDistributionPoint {
            uris: vec![uri.to_string()],
        })
        .collect();
    params
}

pub(crate) fn root(cn: &str, profile: &Profile<'_>) -> TestCa {
    let key = KeyPair::generate().unwrap();
    let rc = params(cn, profile).self_signed(&key).unwrap();
    let cert = Certificate::try_from(rc.der().to_vec()).unwrap();
    TestCa { cert, rc, key }
}

pub(crate) fn issue(issuer: &TestCa, cn: &str, profile: &Profile<'_>) -> TestCa {
    let key = KeyPair::generate().unwrap();
    issue_with_key(issuer, cn, profile, key)
}

pub(crate) fn issue_with_key(
    issuer: &TestCa,
    cn: &str,
    profile: &Profile<'_>,
    key: KeyPair,
) -> TestCa {
    let rc = params(cn, profile)
        .signed_by(&key, &issuer.rc, &issuer.key)
        .unwrap();
    let cert = Certificate::try_from(rc.der().to_vec()).unwrap();
    TestCa { cert, rc, key }
}

pub(crate) fn crl(issuer: &TestCa, revoked: &[&Certificate]) -> Crl {
    let now = OffsetDateTime::now_utc();
    let params = CertificateRevocationListParams {
        this_update: now - Duration::hours(1),
        next_update: now + Duration::days(7),
        crl_number: SerialNumber::from_slice(&[0x01]),
        issuing_distribution_point: None,
        revoked_certs: revoked
            .iter()
            .map(|cert| RevokedCertParams {
                serial_number: SerialNumber::from_slice(&cert.serial().to_signed_bytes_be()),
                revocation_time: now - Duration::minutes(30),
                reason_code: None,
                invalidity_date: None,
            })
            .collect(),
        key_identifier_method: KeyIdMethod::Sha256,
    };
    let crl = params.signed_by(&issuer.rc, &issuer.key).unwrap();
    Crl::from_der(crl.der()).unwrap()
}

fn oid_arcs(dotted: &str) -> Vec<u64> {
    dotted.split('.').map(|arc| arc.parse().unwrap()).collect()
}

fn oid_block(dotted: &str) -> ASN1Block {
    ASN1Block::ObjectIdentifier(0, crate::cert::der::oid_from_str(dotted).unwrap())
}

fn sia_extension(uris: &[&str]) -> CustomExtension {
    let descriptions = uris
        .iter()
        .map(|uri| {
            ASN1Block::Sequence(
                0,
                vec![
                    oid_block("1.3.6.1.5.5.7.48.5"),
                    ASN1Block::Unknown(
                        ASN1Class::ContextSpecific,
                        false,
                        0,
                        BigUint::from(6u8),
                        uri.as_bytes().to_vec(),
                    ),
                ],
            )
        })
        .collect();
    let der = asn1::to_der(&ASN1Block::Sequence(0, descriptions)).unwrap();
    CustomExtension::from_oid_content(&oid_arcs("1.3.6.1.5.5.7.1.11"), der)
}

fn policies_extension(policies: &[&str]) -> CustomExtension {
    let infos = policies
        .iter()
        .map(|policy| ASN1Block::Sequence(0, vec![oid_block(policy)]))
        .collect();
    let der = asn1::to_der(&ASN1Block::Sequence(0, infos)).unwrap();
    CustomExtension::from_oid_content(&oid_arcs("2.5.29.32"), der)
}
