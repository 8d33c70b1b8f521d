//! Certificate authorities and an in-memory transport shared by the integration tests.

#![allow(dead_code)]

use asn1::{ASN1Block, ASN1Class, OID};
use async_trait::async_trait;
use num_bigint::BigUint;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CustomExtension,
    DistinguishedName, DnType, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, RevokedCertParams,
    SerialNumber,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};
use trust_cache::transport::Response;
use trust_cache::{CertBundle, Certificate, Crl, Transport, TransportError};
use url::Url;

pub const COMMON_POLICY: &str = "2.16.840.1.101.3.2.1.3.6";

static SERIAL: AtomicU32 = AtomicU32::new(1);

pub struct Ca {
    pub cert: Certificate,
    pub rc: rcgen::Certificate,
    pub key: KeyPair,
}

#[derive(Default)]
pub struct Profile<'a> {
    pub sia: &'a [&'a str],
    pub crl_uris: &'a [&'a str],
    pub policies: &'a [&'a str],
}

fn params(cn: &str, profile: &Profile<'_>) -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;

    let serial = SERIAL.fetch_add(1, Ordering::SeqCst);
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&serial.to_be_bytes());
    params.serial_number = Some(SerialNumber::from_slice(&bytes));

    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(1);
    params.not_after = now + Duration::days(365);

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.key_identifier_method = KeyIdMethod::Sha256;

    if !profile.sia.is_empty() {
        params.custom_extensions.push(sia_extension(profile.sia));
    }
    if !profile.policies.is_empty() {
        params
            .custom_extensions
            .push(policies_extension(profile.policies));
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

fn finish(rc: rcgen::Certificate, key: KeyPair) -> Ca {
    let cert = Certificate::try_from(rc.der().to_vec()).unwrap();
    Ca { cert, rc, key }
}

/// A self-signed authority.
pub fn root(cn: &str, profile: &Profile<'_>) -> Ca {
    let key = KeyPair::generate().unwrap();
    let rc = params(cn, profile).self_signed(&key).unwrap();
    finish(rc, key)
}

/// An authority with a fresh key issued by `issuer`.
pub fn issue(issuer: &Ca, cn: &str, profile: &Profile<'_>) -> Ca {
    issue_with_key(issuer, cn, profile, KeyPair::generate().unwrap())
}

/// An authority for an existing key issued by `issuer`.
pub fn issue_with_key(issuer: &Ca, cn: &str, profile: &Profile<'_>, key: KeyPair) -> Ca {
    let rc = params(cn, profile)
        .signed_by(&key, &issuer.rc, &issuer.key)
        .unwrap();
    finish(rc, key)
}

/// A certificate naming `named_issuer` as its issuer but signed with `signer`'s key.
pub fn spoofed(named_issuer: &Ca, signer: &Ca, cn: &str) -> Ca {
    let key = KeyPair::generate().unwrap();
    let rc = params(cn, &Profile::default())
        .signed_by(&key, &named_issuer.rc, &signer.key)
        .unwrap();
    finish(rc, key)
}

/// A copy of `ca`'s key pair.
pub fn same_key(ca: &Ca) -> KeyPair {
    KeyPair::from_pem(&ca.key.serialize_pem()).unwrap()
}

/// A current CRL from `issuer` listing `revoked`.
pub fn crl(issuer: &Ca, revoked: &[&Certificate]) -> Crl {
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

/// A certs-only bundle of `cas`.
pub fn bundle(cas: &[&Ca]) -> Vec<u8> {
    CertBundle::from_certificates(cas.iter().map(|ca| ca.cert.clone()).collect())
        .to_certs_only_der()
        .unwrap()
}

fn oid(dotted: &str) -> ASN1Block {
    let arcs = dotted
        .split('.')
        .map(|arc| BigUint::from(arc.parse::<u64>().unwrap()))
        .collect();
    ASN1Block::ObjectIdentifier(0, OID::new(arcs))
}

fn oid_arcs(dotted: &str) -> Vec<u64> {
    dotted.split('.').map(|arc| arc.parse().unwrap()).collect()
}

fn sia_extension(uris: &[&str]) -> CustomExtension {
    let descriptions = uris
        .iter()
        .map(|uri| {
            ASN1Block::Sequence(
                0,
                vec![
                    oid("1.3.6.1.5.5.7.48.5"),
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
        .map(|policy| ASN1Block::Sequence(0, vec![oid(policy)]))
        .collect();
    let der = asn1::to_der(&ASN1Block::Sequence(0, infos)).unwrap();
    CustomExtension::from_oid_content(&oid_arcs("2.5.29.32"), der)
}

/// Serves fixed bodies by URI; anything else fails as unreachable.
#[derive(Debug, Default)]
pub struct StaticTransport {
    routes: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn serve(mut self, uri: &str, body: Vec<u8>) -> Self {
        self.routes
            .insert(Url::parse(uri).unwrap().to_string(), (200, body));
        self
    }

    pub fn serve_status(mut self, uri: &str, status: u16) -> Self {
        self.routes
            .insert(Url::parse(uri).unwrap().to_string(), (status, Vec::new()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, uri: &Url) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(uri.to_string());
        let (status, body) =
            self.routes
                .get(uri.as_str())
                .cloned()
                .ok_or_else(|| TransportError::Request {
                    uri: uri.to_string(),
                    source: "unreachable".into(),
                })?;
        Ok(Response {
            status,
            protocol: "HTTP/1.1".to_string(),
            reason: String::new(),
            cache_control: None,
            body,
            elapsed: StdDuration::from_millis(1),
        })
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn get(&self, uri: &Url) -> Result<Response, TransportError> {
        self.respond(uri)
    }

    async fn post(
        &self,
        uri: &Url,
        _content_type: &str,
        _body: Vec<u8>,
    ) -> Result<Response, TransportError> {
        self.respond(uri)
    }
}
