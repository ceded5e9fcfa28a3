//! Result cache: the durable record of every finished extraction.
//!
//! Existence of an entry is the completion signal for a document. Entries are
//! written once by the pipeline executor and never updated or deleted here;
//! retention is whatever the backing store provides.

mod file;
mod memory;

pub use file::FileResultCache;
pub use memory::MemoryResultCache;

use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Namespace prefix shared by every cache key.
pub const KEY_PREFIX: &str = "ocr:completed:";

/// Store key for a document's result, e.g. `ocr:completed:a9993e36…`.
pub fn cache_key(fingerprint: &DocumentFingerprint) -> String {
    format!("{KEY_PREFIX}{fingerprint}")
}

/// A completed extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: DocumentFingerprint,
    /// Citation fragments, unique, in first-seen order.
    pub fragments: Vec<String>,
}

/// Serialised form of a cache value: `{"result": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheRecord {
    pub result: Vec<String>,
}

impl CacheRecord {
    /// Decode a stored value, reporting schema mismatches against `key`.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, ServiceError> {
        serde_json::from_slice(bytes).map_err(|e| ServiceError::CorruptRecord {
            key: key.to_string(),
            detail: e.to_string(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ServiceError> {
        serde_json::to_vec(self).map_err(|e| ServiceError::Internal(format!("cache encode: {e}")))
    }
}

/// Storage contract for completed results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, fingerprint: &DocumentFingerprint)
        -> Result<Option<CacheEntry>, ServiceError>;

    /// Record `fragments` for `fingerprint`.
    ///
    /// The first write wins: a later `put` for a fingerprint that already has
    /// an entry leaves the stored value untouched.
    async fn put(
        &self,
        fingerprint: &DocumentFingerprint,
        fragments: Vec<String>,
    ) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced() {
        let fp = DocumentFingerprint::of(b"abc");
        assert_eq!(
            cache_key(&fp),
            "ocr:completed:a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn record_wire_shape() {
        let rec = CacheRecord {
            result: vec!["Điều 5 ".into()],
        };
        let bytes = rec.encode().unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(),
            serde_json::json!({ "result": ["Điều 5 "] })
        );
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let err = CacheRecord::decode("k", br#"{"fragments":[]}"#).unwrap_err();
        assert!(matches!(err, ServiceError::CorruptRecord { .. }));
        let err = CacheRecord::decode("k", b"[1,2]").unwrap_err();
        assert!(matches!(err, ServiceError::CorruptRecord { .. }));
    }
}
