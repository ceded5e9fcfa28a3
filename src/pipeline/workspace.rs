//! Per-job scratch directories.
//!
//! A workspace holds the uploaded document (`file.pdf`), one PNG per page and
//! the page manifest. It is created by the submission gateway and owned by
//! exactly one job; the executor deletes it on every exit path.

use crate::fingerprint::DocumentFingerprint;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Name of the uploaded document inside a workspace.
pub const SOURCE_FILE_NAME: &str = "file.pdf";

/// Name of the page manifest consumed by the OCR engine.
pub const MANIFEST_FILE_NAME: &str = "imageFiles.txt";

/// A freshly written upload that has not been handed to the queue yet.
///
/// Dropping it removes the directory, so a rejected or duplicate submission
/// leaves nothing behind. Call [`StagedDocument::keep`] once the job owns it.
#[derive(Debug)]
pub struct StagedDocument {
    dir: TempDir,
    source_path: PathBuf,
}

impl StagedDocument {
    /// Create a unique directory under `root` and write `bytes` into it.
    pub async fn create(
        root: &Path,
        fingerprint: &DocumentFingerprint,
        bytes: &[u8],
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("citescan-{}-", &fingerprint.as_str()[..12]))
            .tempdir_in(root)?;
        let source_path = dir.path().join(SOURCE_FILE_NAME);
        tokio::fs::write(&source_path, bytes).await?;
        debug!("Staged {} in {}", fingerprint, dir.path().display());
        Ok(Self { dir, source_path })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Release ownership of the directory to the caller.
    pub fn keep(self) -> (PathBuf, PathBuf) {
        let source_path = self.source_path;
        (self.dir.keep(), source_path)
    }
}

/// Deletes a job's workspace when the job is done with it.
///
/// The executor calls [`WorkspaceGuard::remove`] on both the success and the
/// failure path. If the run unwinds before that, `Drop` removes the
/// directory synchronously.
#[derive(Debug)]
pub struct WorkspaceGuard {
    path: PathBuf,
    armed: bool,
}

impl WorkspaceGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Recursively delete the workspace. Missing directories are fine.
    pub async fn remove(mut self) -> std::io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed workspace {} during unwind", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove workspace {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_document_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let fp = DocumentFingerprint::of(b"%PDF");
        let staged = StagedDocument::create(root.path(), &fp, b"%PDF").await.unwrap();
        let dir = staged.path().to_path_buf();
        assert_eq!(std::fs::read(staged.source_path()).unwrap(), b"%PDF");
        drop(staged);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn kept_document_survives() {
        let root = tempfile::tempdir().unwrap();
        let fp = DocumentFingerprint::of(b"%PDF");
        let staged = StagedDocument::create(root.path(), &fp, b"%PDF").await.unwrap();
        let (dir, source) = staged.keep();
        assert!(dir.is_dir());
        assert_eq!(source, dir.join(SOURCE_FILE_NAME));
        assert!(dir.starts_with(root.path()));
    }

    #[tokio::test]
    async fn same_fingerprint_gets_distinct_workspaces() {
        let root = tempfile::tempdir().unwrap();
        let fp = DocumentFingerprint::of(b"dup");
        let a = StagedDocument::create(root.path(), &fp, b"dup").await.unwrap();
        let b = StagedDocument::create(root.path(), &fp, b"dup").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn guard_remove_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let ws = root.path().join("ws");
        std::fs::create_dir_all(ws.join("nested")).unwrap();
        std::fs::write(ws.join("nested/1.png"), b"png").unwrap();

        WorkspaceGuard::new(&ws).remove().await.unwrap();
        assert!(!ws.exists());
        WorkspaceGuard::new(&ws).remove().await.unwrap();
    }

    #[test]
    fn guard_cleans_up_on_panic() {
        let root = tempfile::tempdir().unwrap();
        let ws = root.path().join("ws");
        std::fs::create_dir_all(&ws).unwrap();

        let path = ws.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = WorkspaceGuard::new(path);
            panic!("stage blew up");
        });
        assert!(result.is_err());
        assert!(!ws.exists());
    }
}
