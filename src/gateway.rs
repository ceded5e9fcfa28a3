//! Submission and query gateways.
//!
//! Both sit in front of the shared [`ResultCache`] and [`JobQueue`] handles.
//! The cache is always consulted first: once a result exists it wins over
//! any job record that may still be lingering for the same document.

use crate::cache::ResultCache;
use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use crate::pipeline::workspace::StagedDocument;
use crate::queue::{EnqueueOutcome, JobPayload, JobQueue, JobStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The only accepted upload type.
pub const PDF_MIME: &str = "application/pdf";

pub const MSG_DOCUMENT_REQUIRED: &str = "document file is required";
pub const MSG_DOCUMENT_NOT_PDF: &str = "document file must be a PDF";

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// Served from the cache; no work was scheduled.
    Completed {
        fingerprint: DocumentFingerprint,
        fragments: Vec<String>,
    },
    /// A job exists for the document (new or already live).
    Pending { fingerprint: DocumentFingerprint },
}

/// What is known about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Completed { fragments: Vec<String> },
    Pending,
    Failed { reason: String },
    NotFound,
}

#[derive(Clone)]
pub struct Gateway {
    queue: Arc<dyn JobQueue>,
    cache: Arc<dyn ResultCache>,
    workspace_root: PathBuf,
}

impl Gateway {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        cache: Arc<dyn ResultCache>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            queue,
            cache,
            workspace_root: workspace_root.into(),
        }
    }

    /// Accept a document for extraction.
    ///
    /// A cache hit returns immediately without touching the filesystem.
    /// Otherwise the document is written to a fresh workspace and a job is
    /// enqueued under its fingerprint. If a live job already exists the new
    /// workspace is discarded and the existing job is reported as pending.
    pub async fn submit(
        &self,
        document: Option<&[u8]>,
        mime_type: Option<&str>,
    ) -> Result<SubmissionResult, ServiceError> {
        let bytes = match document {
            Some(b) if !b.is_empty() => b,
            _ => return Err(ServiceError::invalid_input(MSG_DOCUMENT_REQUIRED)),
        };
        if !is_pdf_mime(mime_type) {
            return Err(ServiceError::invalid_input(MSG_DOCUMENT_NOT_PDF));
        }

        let fingerprint = DocumentFingerprint::of(bytes);

        if let Some(entry) = self.cache.get(&fingerprint).await? {
            info!("Submission {} served from cache", fingerprint);
            return Ok(SubmissionResult::Completed {
                fingerprint,
                fragments: entry.fragments,
            });
        }

        let staged = StagedDocument::create(&self.workspace_root, &fingerprint, bytes).await?;
        let payload = JobPayload {
            fingerprint: fingerprint.clone(),
            source_path: staged.source_path().to_path_buf(),
            workspace_path: staged.path().to_path_buf(),
        };

        match self.queue.enqueue(payload).await? {
            EnqueueOutcome::Enqueued => {
                let (workspace, _) = staged.keep();
                info!(
                    "Submission {} queued ({} bytes, workspace {})",
                    fingerprint,
                    bytes.len(),
                    workspace.display()
                );
            }
            EnqueueOutcome::AlreadyPresent(status) => {
                // Dropping the staged document removes its directory.
                drop(staged);
                debug!("Submission {} joins existing {} job", fingerprint, status);
            }
        }

        Ok(SubmissionResult::Pending { fingerprint })
    }

    /// Report the state of `id`.
    ///
    /// Ids that are not well-formed fingerprints cannot name any document
    /// and are reported as not found.
    pub async fn query(&self, id: &str) -> Result<QueryResult, ServiceError> {
        let Some(fingerprint) = DocumentFingerprint::parse(id) else {
            debug!("Query for malformed id '{}'", id);
            return Ok(QueryResult::NotFound);
        };

        if let Some(entry) = self.cache.get(&fingerprint).await? {
            return Ok(QueryResult::Completed {
                fragments: entry.fragments,
            });
        }

        let Some(job) = self.queue.get(&fingerprint).await? else {
            return Ok(QueryResult::NotFound);
        };

        match job.status {
            JobStatus::Failed => Ok(QueryResult::Failed {
                reason: job.failure_reason.unwrap_or_default(),
            }),
            JobStatus::Queued | JobStatus::Active => Ok(QueryResult::Pending),
            JobStatus::Completed => {
                error!(
                    "Document {} has a completed job but no cached result",
                    fingerprint
                );
                Err(ServiceError::InconsistentState {
                    fingerprint: fingerprint.to_string(),
                    status: job.status.to_string(),
                })
            }
        }
    }
}

/// Accept `application/pdf`, ignoring case and any parameters.
fn is_pdf_mime(mime_type: Option<&str>) -> bool {
    mime_type
        .and_then(|m| m.split(';').next())
        .is_some_and(|m| m.trim().eq_ignore_ascii_case(PDF_MIME))
}
