//! Error types for the citescan service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ServiceError`]: a gateway or storage operation could not complete
//!   (a bad upload or an unreadable cache record). Returned as
//!   `Err(ServiceError)` from the gateway, cache and queue APIs and mapped to a
//!   structured HTTP response at the API boundary.
//!
//! * [`StageError`]: one stage of a job's pipeline failed, such as the
//!   rasteriser exiting with diagnostics. Never propagated past the pipeline
//!   executor; it is rendered into the job's `failure_reason` and the job is
//!   parked in the FAILED state.

use crate::queue::JobStage;
use thiserror::Error;

/// Errors surfaced by the gateways, the result cache and the job queue.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload was missing or was not the accepted document type.
    #[error("{reason}")]
    InvalidInput { reason: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The queue or cache backend rejected an operation.
    #[error("Storage backend error: {detail}")]
    Storage { detail: String },

    /// A persisted record did not match the expected schema.
    #[error("Corrupt record under '{key}': {detail}")]
    CorruptRecord { key: String, detail: String },

    /// Filesystem error while preparing a workspace or touching the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── State errors ──────────────────────────────────────────────────────
    /// A job exists for the fingerprint but is in no state the query
    /// gateway can report. Indicates a bookkeeping bug.
    #[error("Inconsistent state for document {fingerprint}: job is {status}")]
    InconsistentState { fingerprint: String, status: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn storage(detail: impl std::fmt::Display) -> Self {
        Self::Storage {
            detail: detail.to_string(),
        }
    }

    /// `true` for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// A failure inside one pipeline stage.
///
/// The `Display` output becomes the job's `failReason`, so variants carrying
/// subprocess output embed the raw diagnostic text unchanged.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// The external program could not be started at all.
    #[error("{stage}: failed to start '{program}': {detail}")]
    Spawn {
        stage: JobStage,
        program: String,
        detail: String,
    },

    /// The program ran but exited non-zero or wrote to its error stream.
    #[error("{stage}: {detail}")]
    Failed { stage: JobStage, detail: String },

    /// The per-step watchdog fired and the child was killed.
    #[error("{stage}: timed out after {secs}s")]
    Timeout { stage: JobStage, secs: u64 },

    /// Listing the workspace or writing the page manifest failed.
    #[error("workspace error: {detail}")]
    Workspace { detail: String },

    /// The result could not be written to the result cache.
    #[error("failed to persist result: {detail}")]
    Persist { detail: String },

    /// The pipeline task panicked.
    #[error("pipeline aborted: {detail}")]
    Aborted { detail: String },
}
