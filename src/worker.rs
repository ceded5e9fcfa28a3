//! Fixed-size pool of pipeline workers.
//!
//! Each worker loops: claim the oldest QUEUED job, run it, repeat. Idle
//! workers park on [`JobQueue::wait_for_work`] for at most the configured
//! poll interval. Every job runs in its own task so that a panic inside the
//! pipeline is caught here and recorded as a FAILED job instead of taking
//! the worker down.

use crate::error::StageError;
use crate::fingerprint::DocumentFingerprint;
use crate::pipeline::Pipeline;
use crate::queue::JobQueue;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Running workers plus the token that stops them.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Start `workers` workers sharing `pipeline`.
    pub fn spawn(pipeline: Pipeline, workers: usize, poll_interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..workers.max(1))
            .map(|n| {
                let pipeline = pipeline.clone();
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(n, pipeline, poll_interval, cancel))
            })
            .collect::<Vec<_>>();
        info!("Started {} pipeline workers", handles.len());
        Self { handles, cancel }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop claiming new jobs and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
        info!("All pipeline workers stopped");
    }
}

async fn worker_loop(
    n: usize,
    pipeline: Pipeline,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    debug!("Worker {} started", n);
    let queue = Arc::clone(pipeline.queue());

    while !cancel.is_cancelled() {
        match queue.claim_next().await {
            Ok(Some(job)) => {
                debug!("Worker {} took job {}", n, job.fingerprint);
                let id = job.fingerprint.clone();
                let run = pipeline.clone();
                let joined = tokio::spawn(async move { run.run(job).await }).await;
                if let Err(e) = joined {
                    let detail = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        "task cancelled".to_string()
                    };
                    record_abort(queue.as_ref(), &id, detail).await;
                }
            }
            Ok(None) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = queue.wait_for_work(poll_interval) => {}
                }
            }
            Err(e) => {
                error!("Worker {}: queue unavailable: {}", n, e);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }

    debug!("Worker {} stopped", n);
}

async fn record_abort(queue: &dyn JobQueue, id: &DocumentFingerprint, detail: String) {
    let reason = StageError::Aborted { detail }.to_string();
    error!("Job {} aborted: {}", id, reason);
    if let Err(e) = queue.mark_failed(id, reason).await {
        error!("Job {}: could not record abort: {}", id, e);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
