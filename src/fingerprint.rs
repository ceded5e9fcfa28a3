//! Content fingerprints: the dedup key and job identity for a document.
//!
//! A fingerprint is the SHA-1 digest of the raw upload bytes, rendered as 40
//! lowercase hex characters. The same string is used as the result-cache key
//! suffix, the job id and the `documentId` returned to clients, so existing
//! `ocr:completed:<sha1>` records stay readable.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Length of the hex rendering of a fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 40;

/// Deterministic 160-bit digest of a document's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentFingerprint(String);

impl DocumentFingerprint {
    /// Fingerprint `bytes`. Pure and deterministic.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha1::digest(bytes)))
    }

    /// Parse a client-supplied id.
    ///
    /// Returns `None` unless the input is exactly 40 hex digits. Uppercase
    /// input is normalised so `documentId`s survive case-folding clients.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != FINGERPRINT_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentFingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a document fingerprint: '{value}'"))
    }
}

impl From<DocumentFingerprint> for String {
    fn from(fp: DocumentFingerprint) -> Self {
        fp.0
    }
}
