//! Key identifiers computed from a certificate's public key (RFC 5280 §4.2.1.2).

use crate::cert::Certificate;
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use std::fmt;

/// A key identifier, either asserted by a certificate or computed from its public key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(Vec<u8>);

impl KeyId {
    /// Method 1: SHA-1 of the `subjectPublicKey` BIT STRING contents.
    pub fn method_one(cert: &Certificate) -> Self {
        Self(sha1(&cert.public_key().key_bits).to_vec())
    }

    /// Method 2: a four-bit `0100` type field followed by the least significant
    /// 60 bits of the method-1 hash.
    pub fn method_two(cert: &Certificate) -> Self {
        let hash = sha1(&cert.public_key().key_bits);
        let mut id = hash[hash.len() - 8..].to_vec();
        id[0] = 0x40 | (id[0] & 0x0f);
        Self(id)
    }

    /// The subject key identifier extension value, else method 1.
    pub fn for_subject(cert: &Certificate) -> Self {
        cert.subject_key_id()
            .map(|ski| Self(ski.to_vec()))
            .unwrap_or_else(|| Self::method_one(cert))
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for KeyId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(&self.0))
    }
}

pub(crate) fn sha1(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(digest(&SHA1_FOR_LEGACY_USE_ONLY, data).as_ref());
    out
}
