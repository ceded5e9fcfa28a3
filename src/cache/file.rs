//! File-backed result cache.
//!
//! The namespaced key maps onto a directory tree: `ocr:completed:<fp>` is
//! stored at `<root>/ocr/completed/<fp>.json`. Records are written to a
//! sibling temp file and renamed into place, so readers never observe a
//! partial value.

use super::{cache_key, CacheEntry, CacheRecord, ResultCache};
use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileResultCache {
    root: PathBuf,
}

impl FileResultCache {
    /// Use (and create if needed) `root` as the cache directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let root = root.into();
        tokio::fs::create_dir_all(Self::namespace_dir(&root)).await?;
        Ok(Self { root })
    }

    fn namespace_dir(root: &Path) -> PathBuf {
        root.join("ocr").join("completed")
    }

    fn entry_path(&self, fingerprint: &DocumentFingerprint) -> PathBuf {
        Self::namespace_dir(&self.root).join(format!("{fingerprint}.json"))
    }
}

#[async_trait]
impl ResultCache for FileResultCache {
    async fn get(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Option<CacheEntry>, ServiceError> {
        let path = self.entry_path(fingerprint);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = CacheRecord::decode(&cache_key(fingerprint), &bytes)?;
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
        let path = self.entry_path(fingerprint);
        let bytes = CacheRecord { result: fragments }.encode()?;
        let dir = Self::namespace_dir(&self.root);

        let written = tokio::task::spawn_blocking(move || -> Result<bool, ServiceError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            // persist_noclobber refuses to replace an existing entry.
            match tmp.persist_noclobber(&path) {
                Ok(_) => Ok(true),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e.error.into()),
            }
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("cache write task: {e}")))??;

        if !written {
            debug!("Cache entry {} already present; keeping first write", cache_key(fingerprint));
        }
        Ok(())
    }
}
