//! # citescan
//!
//! Extract legal citation fragments from scanned PDF documents, memoised by
//! document content.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /submit ─▶ fingerprint ─▶ cache hit? ──yes──▶ 200 COMPLETED
//!                                   │ no
//!                                   ▼
//!                    workspace + enqueue (id = fingerprint) ─▶ 202 PENDING
//!                                   │
//!        worker: gs ─▶ natural page order ─▶ tesseract ─▶ regex ─▶ cache.put
//!
//! GET /query/{id} ─▶ cache ─▶ job FAILED ─▶ job live ─▶ NOT_FOUND
//! ```
//!
//! The SHA-1 fingerprint of the upload is the cache key, the job id and the
//! `documentId` returned to clients. A live job per fingerprint is unique, so
//! concurrent duplicate uploads share one pipeline run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use citescan::{api, Service, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().port(2510).build()?;
//!     let service = Service::open(config).await?;
//!     api::serve(service, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `citescan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod pipeline;
pub mod queue;
pub mod service;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{CacheEntry, FileResultCache, MemoryResultCache, ResultCache};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{ServiceError, StageError};
pub use fingerprint::DocumentFingerprint;
pub use gateway::{Gateway, QueryResult, SubmissionResult};
pub use pipeline::command::{CommandOutput, CommandRunner, CommandSpec, RunFailure, SystemCommandRunner};
pub use pipeline::{JobOutcome, Pipeline};
pub use queue::{EnqueueOutcome, Job, JobPayload, JobQueue, JobStage, JobStatus, MemoryJobQueue};
pub use service::Service;
pub use worker::WorkerPool;
