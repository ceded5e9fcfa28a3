use super::{cache_key, CacheEntry, CacheRecord, ResultCache};
use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local result cache.
///
/// Values are held in their serialised form so the same schema check runs
/// on read as for the file-backed store.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Option<CacheEntry>, ServiceError> {
        let key = cache_key(fingerprint);
        let entries = self.entries.read().await;
        let Some(bytes) = entries.get(&key) else {
            return Ok(None);
        };
        let record = CacheRecord::decode(&key, bytes)?;
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            fragments: record.result,
        }))
    }

    async fn put(
        &self,
        fingerprint: &DocumentFingerprint,
        fragments: Vec<String>,
    ) -> Result<(), ServiceError> {
        let key = cache_key(fingerprint);
        let bytes = CacheRecord { result: fragments }.encode()?;
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            debug!("Cache entry {} already present; keeping first write", key);
            return Ok(());
        }
        entries.insert(key, bytes);
        Ok(())
    }
}
