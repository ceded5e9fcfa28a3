//! In-process job queue with an optional JSON journal.
//!
//! All state lives behind one `tokio::sync::Mutex`, which gives `enqueue` its
//! check-and-set atomicity and makes `claim_next` exclusive. When a journal
//! path is configured, every mutation is applied to a copy of the state and
//! the copy is journalled (temp file + rename) before it replaces the live
//! state. A failed journal write leaves the queue exactly as it was.

use super::{EnqueueOutcome, Job, JobPayload, JobQueue, JobStage, JobStatus};
use crate::error::ServiceError;
use crate::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

#[derive(Clone, Default)]
struct QueueState {
    jobs: HashMap<DocumentFingerprint, Job>,
    /// QUEUED fingerprints in arrival order.
    waiting: VecDeque<DocumentFingerprint>,
}

impl QueueState {
    fn job_mut(&mut self, id: &DocumentFingerprint) -> Result<&mut Job, ServiceError> {
        self.jobs
            .get_mut(id)
            .ok_or_else(|| ServiceError::storage(format!("unknown job {id}")))
    }

    /// Waiting jobs first (in order), then everything else.
    fn snapshot(&self) -> Journal {
        let mut jobs: Vec<Job> = self
            .waiting
            .iter()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect();
        let mut rest: Vec<Job> = self
            .jobs
            .values()
            .filter(|j| j.status != JobStatus::Queued)
            .cloned()
            .collect();
        rest.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        jobs.extend(rest);
        Journal { jobs }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Journal {
    jobs: Vec<Job>,
}

/// Job queue held in memory, optionally journalled to disk.
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    journal: Option<PathBuf>,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobQueue {
    /// A queue that forgets everything on restart.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            journal: None,
        }
    }

    /// Open (or create) a journalled queue at `path`.
    ///
    /// Jobs that were ACTIVE when the previous process stopped are put back
    /// to QUEUED if their source document is still on disk; otherwise they
    /// are marked FAILED since nothing is left to process.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref().to_path_buf();
        let journal = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Journal>(&bytes).map_err(|e| {
                ServiceError::CorruptRecord {
                    key: path.display().to_string(),
                    detail: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Journal::default(),
            Err(e) => return Err(e.into()),
        };

        let mut state = QueueState::default();
        let mut recovered = 0usize;
        for mut job in journal.jobs {
            match job.status {
                JobStatus::Queued => state.waiting.push_back(job.fingerprint.clone()),
                JobStatus::Active => {
                    if job.source_path.is_file() {
                        job.status = JobStatus::Queued;
                        job.stage = None;
                        job.logs.push("Requeued after restart".to_string());
                        state.waiting.push_back(job.fingerprint.clone());
                        recovered += 1;
                    } else {
                        job.status = JobStatus::Failed;
                        job.failure_reason =
                            Some("workspace lost while job was active".to_string());
                        job.logs.push("Workspace missing after restart".to_string());
                    }
                }
                JobStatus::Failed => {}
                JobStatus::Completed => continue,
            }
            state.jobs.insert(job.fingerprint.clone(), job);
        }

        info!(
            "Opened job journal {}: {} jobs ({} waiting, {} recovered)",
            path.display(),
            state.jobs.len(),
            state.waiting.len(),
            recovered
        );

        let queue = Self {
            state: Mutex::new(state),
            notify: Notify::new(),
            journal: Some(path),
        };
        {
            let state = queue.state.lock().await;
            queue.persist(&state).await?;
        }
        Ok(queue)
    }

    /// Number of QUEUED jobs.
    pub async fn waiting_len(&self) -> usize {
        self.state.lock().await.waiting.len()
    }

    async fn persist(&self, state: &QueueState) -> Result<(), ServiceError> {
        let Some(ref path) = self.journal else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&state.snapshot())
            .map_err(|e| ServiceError::Internal(format!("journal encode: {e}")))?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Journal `next`, then make it the live state.
    async fn commit(&self, state: &mut QueueState, next: QueueState) -> Result<(), ServiceError> {
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, payload: JobPayload) -> Result<EnqueueOutcome, ServiceError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.jobs.get(&payload.fingerprint) {
            if existing.status.is_live() {
                debug!(
                    "Job {} already {}; enqueue is a no-op",
                    payload.fingerprint, existing.status
                );
                return Ok(EnqueueOutcome::AlreadyPresent(existing.status));
            }
            info!(
                "Replacing {} job {} with a fresh submission",
                existing.status, payload.fingerprint
            );
        }

        let id = payload.fingerprint.clone();
        let mut job = Job::new(payload);
        job.logs.push("Queued".to_string());
        let mut next = state.clone();
        next.jobs.insert(id.clone(), job);
        next.waiting.push_back(id.clone());
        self.commit(&mut state, next).await?;
        drop(state);

        info!("Enqueued job {}", id);
        self.notify.notify_one();
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn claim_next(&self) -> Result<Option<Job>, ServiceError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();

        while let Some(id) = next.waiting.pop_front() {
            let Some(job) = next.jobs.get_mut(&id) else {
                continue;
            };
            if job.status != JobStatus::Queued {
                warn!("Skipping stale queue entry {} ({})", id, job.status);
                continue;
            }
            job.status = JobStatus::Active;
            job.stage = None;
            let claimed = job.clone();
            self.commit(&mut state, next).await?;
            debug!("Claimed job {}", id);
            return Ok(Some(claimed));
        }

        // Only stale entries were dropped; the journal snapshot is unchanged.
        *state = next;
        Ok(None)
    }

    async fn wait_for_work(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }

    async fn get(&self, id: &DocumentFingerprint) -> Result<Option<Job>, ServiceError> {
        Ok(self.state.lock().await.jobs.get(id).cloned())
    }

    async fn set_stage(
        &self,
        id: &DocumentFingerprint,
        stage: JobStage,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.job_mut(id)?.stage = Some(stage);
        self.commit(&mut state, next).await
    }

    async fn append_log(&self, id: &DocumentFingerprint, line: String) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.job_mut(id)?.logs.push(line);
        self.commit(&mut state, next).await
    }

    async fn mark_completed(&self, id: &DocumentFingerprint) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.job_mut(id)?;
        next.jobs.remove(id);
        next.waiting.retain(|w| w != id);
        self.commit(&mut state, next).await?;
        info!("Job {} completed and removed", id);
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &DocumentFingerprint,
        reason: String,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let job = next.job_mut(id)?;
        job.status = JobStatus::Failed;
        job.logs.push(format!("Failed: {reason}"));
        job.failure_reason = Some(reason);
        next.waiting.retain(|w| w != id);
        self.commit(&mut state, next).await?;
        warn!("Job {} failed", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn payload(tag: &[u8], dir: &Path) -> JobPayload {
        let ws = dir.join(hex_tag(tag));
        JobPayload {
            fingerprint: DocumentFingerprint::of(tag),
            source_path: ws.join("file.pdf"),
            workspace_path: ws,
        }
    }

    fn hex_tag(tag: &[u8]) -> String {
        DocumentFingerprint::of(tag).to_string()
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_while_live() {
        let q = MemoryJobQueue::new();
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            q.enqueue(payload(b"a", dir.path())).await.unwrap(),
            EnqueueOutcome::Enqueued
        );
        assert_eq!(
            q.enqueue(payload(b"a", dir.path())).await.unwrap(),
            EnqueueOutcome::AlreadyPresent(JobStatus::Queued)
        );

        let claimed = q.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Active);
        assert_eq!(
            q.enqueue(payload(b"a", dir.path())).await.unwrap(),
            EnqueueOutcome::AlreadyPresent(JobStatus::Active)
        );
        assert!(q.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claims_in_arrival_order() {
        let q = MemoryJobQueue::new();
        let dir = tempfile::tempdir().unwrap();
        for tag in [b"1", b"2", b"3"] {
            q.enqueue(payload(tag, dir.path())).await.unwrap();
        }
        let order: Vec<_> = [
            q.claim_next().await.unwrap().unwrap(),
            q.claim_next().await.unwrap().unwrap(),
            q.claim_next().await.unwrap().unwrap(),
        ]
        .into_iter()
        .map(|j| j.fingerprint)
        .collect();
        assert_eq!(
            order,
            vec![
                DocumentFingerprint::of(b"1"),
                DocumentFingerprint::of(b"2"),
                DocumentFingerprint::of(b"3"),
            ]
        );
    }

    #[tokio::test]
    async fn completed_jobs_are_removed() {
        let q = MemoryJobQueue::new();
        let dir = tempfile::tempdir().unwrap();
        let p = payload(b"done", dir.path());
        let id = p.fingerprint.clone();
        q.enqueue(p).await.unwrap();
        q.claim_next().await.unwrap();
        q.mark_completed(&id).await.unwrap();
        assert!(q.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_jobs_stay_queryable_and_can_be_resubmitted() {
        let q = MemoryJobQueue::new();
        let dir = tempfile::tempdir().unwrap();
        let p = payload(b"bad", dir.path());
        let id = p.fingerprint.clone();
        q.enqueue(p.clone()).await.unwrap();
        q.claim_next().await.unwrap();
        q.set_stage(&id, JobStage::Rasterizing).await.unwrap();
        q.mark_failed(&id, "rasterizing: boom".into()).await.unwrap();

        let failed = q.get(&id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("rasterizing: boom"));
        assert_eq!(failed.stage, Some(JobStage::Rasterizing));

        assert_eq!(q.enqueue(p).await.unwrap(), EnqueueOutcome::Enqueued);
        let fresh = q.get(&id).await.unwrap().unwrap();
        assert_eq!(fresh.status, JobStatus::Queued);
        assert!(fresh.failure_reason.is_none());
    }

    #[tokio::test]
    async fn concurrent_enqueues_create_one_job() {
        let q = Arc::new(MemoryJobQueue::new());
        let dir = tempfile::tempdir().unwrap();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let q = Arc::clone(&q);
            let p = payload(b"same", dir.path());
            handles.push(tokio::spawn(async move { q.enqueue(p).await.unwrap() }));
        }
        let mut enqueued = 0;
        for h in handles {
            if h.await.unwrap() == EnqueueOutcome::Enqueued {
                enqueued += 1;
            }
        }
        assert_eq!(enqueued, 1);
        assert_eq!(q.waiting_len().await, 1);
    }

    #[tokio::test]
    async fn logs_are_appended() {
        let q = MemoryJobQueue::new();
        let dir = tempfile::tempdir().unwrap();
        let p = payload(b"log", dir.path());
        let id = p.fingerprint.clone();
        q.enqueue(p).await.unwrap();
        q.append_log(&id, "Start processing job".into()).await.unwrap();
        let job = q.get(&id).await.unwrap().unwrap();
        assert_eq!(job.logs, vec!["Queued", "Start processing job"]);
    }

    #[tokio::test]
    async fn unknown_job_transitions_error() {
        let q = MemoryJobQueue::new();
        let id = DocumentFingerprint::of(b"ghost");
        assert!(q.mark_completed(&id).await.is_err());
        assert!(q.mark_failed(&id, "x".into()).await.is_err());
    }

    #[tokio::test]
    async fn journal_recovers_active_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("queue.json");

        // One job whose source survives, one whose workspace vanished.
        let kept = payload(b"kept", dir.path());
        std::fs::create_dir_all(&kept.workspace_path).unwrap();
        std::fs::write(&kept.source_path, b"%PDF").unwrap();
        let lost = payload(b"lost", dir.path());

        {
            let q = MemoryJobQueue::open(&journal).await.unwrap();
            q.enqueue(kept.clone()).await.unwrap();
            q.enqueue(lost.clone()).await.unwrap();
            q.claim_next().await.unwrap();
            q.claim_next().await.unwrap();
        }

        let q = MemoryJobQueue::open(&journal).await.unwrap();
        let kept_job = q.get(&kept.fingerprint).await.unwrap().unwrap();
        assert_eq!(kept_job.status, JobStatus::Queued);
        let lost_job = q.get(&lost.fingerprint).await.unwrap().unwrap();
        assert_eq!(lost_job.status, JobStatus::Failed);
        assert_eq!(q.waiting_len().await, 1);
        assert_eq!(
            q.claim_next().await.unwrap().map(|j| j.fingerprint),
            Some(kept.fingerprint)
        );
    }

    #[tokio::test]
    async fn failed_journal_write_leaves_enqueue_unapplied() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        let q = MemoryJobQueue::open(sub.join("queue.json")).await.unwrap();
        let p = payload(b"unwritten", dir.path());
        let id = p.fingerprint.clone();

        std::fs::remove_dir_all(&sub).unwrap();
        assert!(q.enqueue(p.clone()).await.is_err());
        assert!(q.get(&id).await.unwrap().is_none());
        assert_eq!(q.waiting_len().await, 0);

        std::fs::create_dir_all(&sub).unwrap();
        assert_eq!(q.enqueue(p).await.unwrap(), EnqueueOutcome::Enqueued);
    }

    #[tokio::test]
    async fn failed_journal_write_leaves_job_claimable() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        let q = MemoryJobQueue::open(sub.join("queue.json")).await.unwrap();
        let p = payload(b"claim", dir.path());
        let id = p.fingerprint.clone();
        q.enqueue(p).await.unwrap();

        std::fs::remove_dir_all(&sub).unwrap();
        assert!(q.claim_next().await.is_err());
        assert!(q.mark_failed(&id, "x".into()).await.is_err());
        assert!(q.append_log(&id, "lost".into()).await.is_err());
        let job = q.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.logs, vec!["Queued"]);
        assert_eq!(q.waiting_len().await, 1);

        std::fs::create_dir_all(&sub).unwrap();
        let claimed = q.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.fingerprint, id);
        assert_eq!(claimed.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn corrupt_journal_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("queue.json");
        std::fs::write(&journal, b"not json").unwrap();
        let err = MemoryJobQueue::open(&journal).await.err().unwrap();
        assert!(matches!(err, ServiceError::CorruptRecord { .. }));
    }
}
