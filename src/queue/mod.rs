//! Job queue: the durable work list keyed by document fingerprint.
//!
//! The fingerprint *is* the job id, so the queue can enforce "at most one
//! live job per document" with a single check-and-set under its own lock.
//! Enqueueing a fingerprint that is already QUEUED or ACTIVE is a no-op
//! reported as [`EnqueueOutcome::AlreadyPresent`]; a FAILED job with the same
//! id is replaced so that resubmission retries the document.
//!
//! ## Lifecycle
//!
//! ```text
//! enqueue ──▶ QUEUED ──claim_next──▶ ACTIVE{rasterizing → ocr → extracting}
//!                                      │
//!                       mark_completed │ mark_failed
//!                         (removed) ◀──┴──▶ FAILED (kept, queryable)
//! ```
//!
//! Status transitions after `enqueue` belong to the pipeline executor.

mod memory;

pub use memory::MemoryJobQueue;

use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    /// QUEUED or ACTIVE: a worker will (or does) own this job.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Queued | Self::Active)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Sub-state of an ACTIVE job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Rasterizing,
    Ocr,
    Extracting,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rasterizing => "rasterizing",
            Self::Ocr => "ocr",
            Self::Extracting => "extracting",
        })
    }
}

/// What the submission gateway hands to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub fingerprint: DocumentFingerprint,
    /// The uploaded document inside `workspace_path`.
    pub source_path: PathBuf,
    /// Scratch directory owned by the job until it reaches a terminal state.
    pub workspace_path: PathBuf,
}

/// A unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub fingerprint: DocumentFingerprint,
    pub source_path: PathBuf,
    pub workspace_path: PathBuf,
    pub status: JobStatus,
    /// Set while ACTIVE; kept on FAILED to show where the run stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Append-only progress log.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            fingerprint: payload.fingerprint,
            source_path: payload.source_path,
            workspace_path: payload.workspace_path,
            status: JobStatus::Queued,
            stage: None,
            failure_reason: None,
            logs: Vec::new(),
        }
    }
}

/// Result of an idempotent enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new QUEUED job was created.
    Enqueued,
    /// A live job with this fingerprint already exists; nothing changed.
    AlreadyPresent(JobStatus),
}

/// Storage contract for jobs.
///
/// Implementations must make `enqueue` an atomic check-and-set and must hand
/// each QUEUED job to exactly one `claim_next` caller.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a QUEUED job unless a live job with the same fingerprint exists.
    async fn enqueue(&self, payload: JobPayload) -> Result<EnqueueOutcome, ServiceError>;

    /// Take the oldest QUEUED job and mark it ACTIVE.
    async fn claim_next(&self) -> Result<Option<Job>, ServiceError>;

    /// Park an idle worker until work may be available or `timeout` passes.
    async fn wait_for_work(&self, timeout: Duration) {
        tokio::time::sleep(timeout).await;
    }

    async fn get(&self, id: &DocumentFingerprint) -> Result<Option<Job>, ServiceError>;

    /// Record the ACTIVE sub-stage.
    async fn set_stage(&self, id: &DocumentFingerprint, stage: JobStage)
        -> Result<(), ServiceError>;

    /// Append one line to the job's log.
    async fn append_log(&self, id: &DocumentFingerprint, line: String) -> Result<(), ServiceError>;

    /// Terminal success: the job is removed.
    async fn mark_completed(&self, id: &DocumentFingerprint) -> Result<(), ServiceError>;

    /// Terminal failure: the job is kept as FAILED with `reason`.
    async fn mark_failed(&self, id: &DocumentFingerprint, reason: String)
        -> Result<(), ServiceError>;
}
