//! Single-certificate OCSP client (RFC 6960).
//!
//! Requests carry one `CertID` (SHA-1 name and key hashes) and are POSTed as
//! `application/ocsp-request`. Only `id-pkix-ocsp-basic` responses are understood.

use crate::cert::cert_id::CertId;
use crate::cert::der::{oid_to_string, tlv_is_oid, Tlv};
use crate::cert::error::CertificateError;
use crate::cert::parsing::to_certificate_vec_unbounded;
use crate::cert::signature::verify_signed_data;
use crate::cert::Certificate;
use crate::constants::{oid, OCSP_REQUEST_CONTENT_TYPE};
use crate::locator::Locator;
use crate::prelude::{debug, warn};
use crate::transport::{Fetcher, TransportError};
use asn1::ASN1Block;
use std::fmt;
use time::OffsetDateTime;

/// Revocation status reported by a responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcspStatus {
    /// The certificate is not revoked.
    Good,
    /// The certificate is revoked.
    Revoked,
    /// The responder does not know the certificate, or declined to answer.
    Unknown,
}

impl fmt::Display for OcspStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OcspStatus::Good => "GOOD",
            OcspStatus::Revoked => "REVOKED",
            OcspStatus::Unknown => "UNKNOWN",
        })
    }
}

/// Hard OCSP failures, distinct from an [`OcspStatus::Unknown`] answer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OcspError {
    /// The request could not be sent or the response not received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The responder returned no body.
    #[error("no OCSP response from {uri}")]
    NoResponse {
        /// The responder URI.
        uri: String,
    },

    /// The response is not a well-formed basic OCSP response.
    #[error("malformed OCSP response: {0}")]
    Malformed(&'static str),

    /// A DER structure inside the response failed to decode.
    #[error(transparent)]
    Decode(#[from] CertificateError),

    /// The response signature does not verify under any candidate responder key.
    #[error("OCSP response signature does not verify")]
    InvalidSignature,

    /// The response does not cover the requested certificate.
    #[error("OCSP response does not cover the requested certificate")]
    NoMatchingResponse,
}

/// OCSP client sending through a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct OcspClient {
    fetcher: Fetcher,
}

impl OcspClient {
    /// Creates a client.
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Queries `responder` for the status of `cert`, issued by `issuer`.
    ///
    /// # Errors
    ///
    /// Returns an [`OcspError`] when no usable, correctly signed response is obtained.
    pub async fn check(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
        responder: &Locator,
    ) -> Result<OcspStatus, OcspError> {
        let cert_id = CertId::new(issuer, cert);
        let request = build_request(&cert_id)?;
        let body = self
            .fetcher
            .post(responder, OCSP_REQUEST_CONTENT_TYPE, request)
            .await?
            .ok_or_else(|| OcspError::NoResponse {
                uri: responder.to_string(),
            })?;
        let status = parse_response(&body, &cert_id, issuer)?;
        debug!(
            "OCSP status; subject={}, responder={}, status={}",
            cert.subject(),
            responder,
            status
        );
        Ok(status)
    }
}

/// Encodes an `OCSPRequest` for a single `CertID`.
///
/// # Errors
///
/// Returns [`OcspError::Decode`] if DER encoding fails.
pub fn build_request(cert_id: &CertId) -> Result<Vec<u8>, OcspError> {
    let request = ASN1Block::Sequence(0, vec![cert_id.to_asn1()?]);
    let request_list = ASN1Block::Sequence(0, vec![request]);
    let tbs_request = ASN1Block::Sequence(0, vec![request_list]);
    let ocsp_request = ASN1Block::Sequence(0, vec![tbs_request]);
    Ok(asn1::to_der(&ocsp_request).map_err(CertificateError::from)?)
}

/// Decodes an `OCSPResponse` and returns the status it gives for `cert_id`.
///
/// The signature must verify under `issuer`, or under an embedded delegated responder that
/// `issuer` signed and that carries `id-kp-OCSPSigning` (RFC 6960 §4.2.2.2).
///
/// # Errors
///
/// Returns an [`OcspError`] if the response is malformed, unsigned by an authorized
/// responder, or does not mention `cert_id`.
pub fn parse_response(
    body: &[u8],
    cert_id: &CertId,
    issuer: &Certificate,
) -> Result<OcspStatus, OcspError> {
    let outer = Tlv::single(body)?;
    if !outer.is_sequence() {
        return Err(OcspError::Malformed("response"));
    }
    let fields = outer.children()?;
    let status = match fields.first() {
        Some(status) if status.is_universal(ENUMERATED) => match status.contents() {
            [status] => *status,
            _ => return Err(OcspError::Malformed("response status")),
        },
        _ => return Err(OcspError::Malformed("response status")),
    };
    if status != 0 {
        warn!("OCSP responder declined; status={}", status);
        return Ok(OcspStatus::Unknown);
    }

    let response_bytes = match fields.get(1) {
        Some(tagged) if tagged.context_tag() == Some(0) => match tagged.children()?.as_slice() {
            [response_bytes] if response_bytes.is_sequence() => response_bytes.children()?,
            _ => return Err(OcspError::Malformed("response bytes")),
        },
        _ => return Err(OcspError::Malformed("missing response bytes")),
    };
    let basic = match response_bytes.as_slice() {
        [response_type, basic]
            if tlv_is_oid(response_type, oid::OCSP_BASIC) && basic.is_universal(OCTET_STRING) =>
        {
            BasicResponse::parse(basic.contents())?
        }
        _ => return Err(OcspError::Malformed("response type is not basic")),
    };

    let verified = std::iter::once(issuer)
        .chain(
            basic
                .certs
                .iter()
                .filter(|cert| is_delegated_responder(cert, issuer)),
        )
        .any(|signer| {
            verify_signed_data(
                signer.public_key(),
                &basic.signature_algorithm,
                basic.tbs.raw(),
                basic.signature,
            )
            .is_ok()
        });
    if !verified {
        return Err(OcspError::InvalidSignature);
    }

    single_response_status(&basic.tbs, cert_id)
}

const BIT_STRING: u32 = 3;
const OCTET_STRING: u32 = 4;
const ENUMERATED: u32 = 10;

/// The parts of a `BasicOCSPResponse` signature checking needs.
struct BasicResponse<'a> {
    tbs: Tlv<'a>,
    signature_algorithm: String,
    signature: &'a [u8],
    certs: Vec<Certificate>,
}

impl<'a> BasicResponse<'a> {
    fn parse(der: &'a [u8]) -> Result<Self, OcspError> {
        let outer = Tlv::single(der)?;
        if !outer.is_sequence() {
            return Err(OcspError::Malformed("basic response"));
        }
        let items = outer.children()?;
        let [tbs, algorithm, signature, rest @ ..] = items.as_slice() else {
            return Err(OcspError::Malformed("basic response"));
        };
        if !tbs.is_sequence() {
            return Err(OcspError::Malformed("tbs response data"));
        }

        let algorithm_oid = match algorithm.is_sequence().then(|| algorithm.children()) {
            Some(parts) => parts?.first().map(Tlv::to_block).transpose()?,
            None => None,
        };
        let signature_algorithm = match algorithm_oid {
            Some(ASN1Block::ObjectIdentifier(_, id)) => oid_to_string(&id)?,
            _ => return Err(OcspError::Malformed("signature algorithm")),
        };

        let signature = match signature.contents() {
            [0, bits @ ..] if signature.is_universal(BIT_STRING) => bits,
            _ => return Err(OcspError::Malformed("signature")),
        };

        let certs = match rest.first() {
            Some(tagged) if tagged.context_tag() == Some(0) => {
                match tagged.children()?.as_slice() {
                    [certs] if certs.is_sequence() => {
                        to_certificate_vec_unbounded(certs.contents())?
                    }
                    _ => return Err(OcspError::Malformed("certs")),
                }
            }
            _ => Vec::new(),
        };

        Ok(Self {
            tbs: *tbs,
            signature_algorithm,
            signature,
            certs,
        })
    }
}

fn is_delegated_responder(responder: &Certificate, issuer: &Certificate) -> bool {
    let authorized = responder.issuer() == issuer.subject()
        && responder
            .extended_key_usage()
            .is_some_and(|eku| eku.ocsp_signing)
        && responder
            .check_validity_at(OffsetDateTime::now_utc())
            .is_ok()
        && responder.verify_issued_by(issuer).is_ok();
    if !authorized && responder != issuer {
        debug!(
            "Ignoring embedded OCSP certificate; subject={}, issuer={}",
            responder.subject(),
            issuer.subject()
        );
    }
    authorized
}

fn single_response_status(tbs: &Tlv<'_>, cert_id: &CertId) -> Result<OcspStatus, OcspError> {
    let fields = tbs.children()?;
    // version [0] is optional; responderID is [1] or [2]; producedAt; then responses.
    let responses = fields
        .iter()
        .skip_while(|field| field.context_tag().is_some())
        .skip(1)
        .find(|field| field.is_sequence())
        .ok_or(OcspError::Malformed("responses"))?;

    for response in responses.children()? {
        if !response.is_sequence() {
            return Err(OcspError::Malformed("single response"));
        }
        let fields = response.children()?;
        let Some(id) = fields.first().filter(|id| id.is_sequence()) else {
            return Err(OcspError::Malformed("single response cert id"));
        };
        if &CertId::from_der(id.raw())? != cert_id {
            continue;
        }
        return match fields.get(1).and_then(Tlv::context_tag) {
            Some(0) => Ok(OcspStatus::Good),
            Some(1) => Ok(OcspStatus::Revoked),
            Some(2) => Ok(OcspStatus::Unknown),
            _ => Err(OcspError::Malformed("cert status")),
        };
    }
    Err(OcspError::NoMatchingResponse)
}
