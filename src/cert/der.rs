//! Helpers over `simple_asn1` blocks.

use crate::cert::error::CertificateError;
use asn1::{ASN1Block, ASN1Class, OID};
use num_bigint::BigUint;
use x509_parser::asn1_rs::{Any, Class, FromDer};

/// Renders an OID in dotted form.
pub(crate) fn oid_to_string(oid: &OID) -> Result<String, CertificateError> {
    let arcs: Vec<u64> = oid.as_vec()?;
    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}

/// Parses a dotted OID.
pub(crate) fn oid_from_str(dotted: &str) -> Result<OID, CertificateError> {
    let arcs = dotted
        .split('.')
        .map(|arc| arc.parse::<u64>().map(BigUint::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CertificateError::Malformed("object identifier"))?;
    Ok(OID::new(arcs))
}

/// Returns `true` if `block` is an `OBJECT IDENTIFIER` equal to `dotted`.
pub(crate) fn is_oid(block: &ASN1Block, dotted: &str) -> bool {
    match block {
        ASN1Block::ObjectIdentifier(_, oid) => oid_to_string(oid).is_ok_and(|s| s == dotted),
        _ => false,
    }
}

/// Returns the context-specific tag number of `block`, if it carries one.
pub(crate) fn context_tag(block: &ASN1Block) -> Option<u64> {
    let tag = match block {
        ASN1Block::Explicit(ASN1Class::ContextSpecific, _, tag, _) => tag,
        ASN1Block::Unknown(ASN1Class::ContextSpecific, _, _, tag, _) => tag,
        _ => return None,
    };
    u64::try_from(tag).ok()
}

/// Decodes `bytes` and returns its single top-level `SEQUENCE` contents.
pub(crate) fn decode_sequence(bytes: &[u8]) -> Result<Vec<ASN1Block>, CertificateError> {
    let mut blocks = asn1::from_der(bytes)?;
    match blocks.pop() {
        Some(ASN1Block::Sequence(_, items)) if blocks.is_empty() => Ok(items),
        _ => Err(CertificateError::Malformed("sequence")),
    }
}

pub(crate) fn algorithm_identifier(
    dotted: &str,
    with_null: bool,
) -> Result<ASN1Block, CertificateError> {
    let mut items = vec![ASN1Block::ObjectIdentifier(0, oid_from_str(dotted)?)];
    if with_null {
        items.push(ASN1Block::Null(0));
    }
    Ok(ASN1Block::Sequence(0, items))
}

const SEQUENCE: u32 = 16;

/// A DER element borrowed from its input.
///
/// `simple_asn1` refuses empty `SET`s and `SEQUENCE`s, which CMS and OCSP structures carry,
/// so container structures are walked element by element with this reader and only the
/// leaves are handed to `simple_asn1`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tlv<'a> {
    raw: &'a [u8],
    contents: &'a [u8],
    class: Class,
    tag: u32,
    constructed: bool,
}

impl<'a> Tlv<'a> {
    /// Reads the first element of `input`, returning it and the bytes that follow.
    pub(crate) fn read(input: &'a [u8]) -> Result<(Self, &'a [u8]), CertificateError> {
        let (rest, any) =
            Any::from_der(input).map_err(|_| CertificateError::Malformed("DER element"))?;
        let raw = input
            .get(..input.len() - rest.len())
            .ok_or(CertificateError::Malformed("DER element"))?;
        let element = Self {
            raw,
            contents: any.data,
            class: any.header.class(),
            tag: any.header.tag().0,
            constructed: any.header.is_constructed(),
        };
        Ok((element, rest))
    }

    /// Reads `input` as exactly one element.
    pub(crate) fn single(input: &'a [u8]) -> Result<Self, CertificateError> {
        match Self::read(input)? {
            (element, []) => Ok(element),
            _ => Err(CertificateError::Malformed("trailing data after DER element")),
        }
    }

    /// Reads every element of `input` in order.
    pub(crate) fn read_all(mut input: &'a [u8]) -> Result<Vec<Self>, CertificateError> {
        let mut elements = Vec::new();
        while !input.is_empty() {
            let (element, rest) = Self::read(input)?;
            elements.push(element);
            input = rest;
        }
        Ok(elements)
    }

    /// The complete encoding, header included.
    pub(crate) fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// The contents octets.
    pub(crate) fn contents(&self) -> &'a [u8] {
        self.contents
    }

    /// The elements inside a constructed element.
    pub(crate) fn children(&self) -> Result<Vec<Self>, CertificateError> {
        if !self.constructed {
            return Err(CertificateError::Malformed("primitive DER element"));
        }
        Self::read_all(self.contents)
    }

    /// Returns `true` for a universal `SEQUENCE`.
    pub(crate) fn is_sequence(&self) -> bool {
        self.class == Class::Universal && self.tag == SEQUENCE && self.constructed
    }

    /// Returns `true` for a universal element with tag number `tag`.
    pub(crate) fn is_universal(&self, tag: u32) -> bool {
        self.class == Class::Universal && self.tag == tag
    }

    /// The context-specific tag number, if the element carries one.
    pub(crate) fn context_tag(&self) -> Option<u32> {
        (self.class == Class::ContextSpecific).then_some(self.tag)
    }

    /// Decodes a leaf element with `simple_asn1`.
    pub(crate) fn to_block(&self) -> Result<ASN1Block, CertificateError> {
        let mut blocks = asn1::from_der(self.raw)?;
        match blocks.pop() {
            Some(block) if blocks.is_empty() => Ok(block),
            _ => Err(CertificateError::Malformed("DER element")),
        }
    }
}

/// Returns `true` if `element` is an `OBJECT IDENTIFIER` equal to `dotted`.
pub(crate) fn tlv_is_oid(element: &Tlv<'_>, dotted: &str) -> bool {
    element.is_universal(6) && element.to_block().is_ok_and(|block| is_oid(&block, dotted))
}
