//! Pipeline executor: turns one claimed job into a cache entry or a failure.
//!
//! ## Data Flow
//!
//! ```text
//! file.pdf ──▶ rasterize ──▶ pages ──▶ ocr ──▶ extract ──▶ cache.put
//!              (gs, PNGs)   (manifest) (tesseract) (regex)
//! ```
//!
//! 1. [`rasterize`] renders every page to `<n>.png` inside the workspace
//! 2. [`pages`] sorts the images naturally and writes `imageFiles.txt`
//! 3. [`ocr`] runs the OCR engine over the manifest and captures stdout
//! 4. [`extract`] applies the citation pattern and dedupes the matches
//!
//! Any [`StageError`] stops the run. Whatever the outcome, the workspace is
//! removed before the job reaches its terminal state, and the job's status
//! is only ever changed here.

pub mod command;
pub mod extract;
pub mod ocr;
pub mod pages;
pub mod rasterize;
pub mod workspace;

use crate::cache::ResultCache;
use crate::config::ServiceConfig;
use crate::error::StageError;
use crate::fingerprint::DocumentFingerprint;
use crate::queue::{Job, JobQueue, JobStage};
use command::CommandRunner;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use workspace::WorkspaceGuard;

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The result was cached; carries the number of fragments.
    Completed(usize),
    /// The job was marked FAILED with this reason.
    Failed(String),
}

/// Runs jobs against shared cache, queue and subprocess handles.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<ServiceConfig>,
    queue: Arc<dyn JobQueue>,
    cache: Arc<dyn ResultCache>,
    runner: Arc<dyn CommandRunner>,
}

impl Pipeline {
    pub fn new(
        config: Arc<ServiceConfig>,
        queue: Arc<dyn JobQueue>,
        cache: Arc<dyn ResultCache>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            queue,
            cache,
            runner,
        }
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Execute `job`, which must already be ACTIVE, through to a terminal state.
    pub async fn run(&self, job: Job) -> JobOutcome {
        let id = job.fingerprint.clone();
        let guard = WorkspaceGuard::new(&job.workspace_path);
        let started = Instant::now();

        self.log(&id, "Start processing job".to_string()).await;
        self.log(&id, format!("Workspace {}", job.workspace_path.display()))
            .await;

        let result = self.execute(&job).await;

        if let Err(e) = guard.remove().await {
            warn!(
                "Job {}: could not remove workspace {}: {}",
                id,
                job.workspace_path.display(),
                e
            );
        }

        match result {
            Ok(count) => {
                self.log(&id, "Finished".to_string()).await;
                if let Err(e) = self.queue.mark_completed(&id).await {
                    error!("Job {}: result cached but job not cleared: {}", id, e);
                }
                info!(
                    "Job {} completed: {} fragments in {:.1}s",
                    id,
                    count,
                    started.elapsed().as_secs_f64()
                );
                JobOutcome::Completed(count)
            }
            Err(stage_err) => {
                let reason = stage_err.to_string();
                warn!("Job {} failed: {}", id, reason);
                if let Err(e) = self.queue.mark_failed(&id, reason.clone()).await {
                    error!("Job {}: could not record failure: {}", id, e);
                }
                JobOutcome::Failed(reason)
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<usize, StageError> {
        let id = &job.fingerprint;
        let ws = job.workspace_path.as_path();
        let runner = self.runner.as_ref();

        self.enter(id, JobStage::Rasterizing).await;
        self.log(id, "Starting rasterizer".to_string()).await;
        rasterize::rasterize(runner, &self.config, ws).await?;

        let pages = pages::list_page_images(ws).await?;
        if pages.is_empty() {
            return Err(StageError::Failed {
                stage: JobStage::Rasterizing,
                detail: "no page images were produced".to_string(),
            });
        }
        pages::write_manifest(ws, &pages).await?;
        self.log(id, format!("Rasterized {} pages", pages.len())).await;

        self.enter(id, JobStage::Ocr).await;
        self.log(id, "Starting OCR".to_string()).await;
        let text = ocr::recognize(runner, &self.config, ws).await?;
        self.log(id, "Finished OCR".to_string()).await;

        self.enter(id, JobStage::Extracting).await;
        let fragments = extract::extract_fragments(&text);
        let count = fragments.len();
        self.log(id, format!("Extracted {count} fragments")).await;

        self.cache
            .put(id, fragments)
            .await
            .map_err(|e| StageError::Persist {
                detail: e.to_string(),
            })?;
        self.log(id, "Result stored".to_string()).await;

        Ok(count)
    }

    async fn enter(&self, id: &DocumentFingerprint, stage: JobStage) {
        debug!("Job {} entering {}", id, stage);
        if let Err(e) = self.queue.set_stage(id, stage).await {
            warn!("Job {}: could not record stage {}: {}", id, stage, e);
        }
    }

    async fn log(&self, id: &DocumentFingerprint, line: String) {
        debug!("Job {}: {}", id, line);
        if let Err(e) = self.queue.append_log(id, line).await {
            warn!("Job {}: could not append log: {}", id, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-in for the external programs.

    use super::command::{CommandOutput, CommandRunner, CommandSpec, RunFailure};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Pretends to be `gs` and `tesseract`.
    ///
    /// The rasteriser call writes `page_count` PNGs next to the output
    /// pattern; the OCR call returns `ocr_text`. Either step can be told to
    /// fail with stderr output, and OCR can be made to hit its watchdog.
    pub struct FakeTools {
        pub page_count: usize,
        pub ocr_text: String,
        pub rasterize_stderr: Option<String>,
        pub ocr_stderr: Option<String>,
        pub ocr_times_out: bool,
        pub rasterize_calls: AtomicUsize,
        pub manifests: Mutex<Vec<String>>,
    }

    impl FakeTools {
        pub fn new(page_count: usize, ocr_text: &str) -> Self {
            Self {
                page_count,
                ocr_text: ocr_text.to_string(),
                rasterize_stderr: None,
                ocr_stderr: None,
                ocr_times_out: false,
                rasterize_calls: AtomicUsize::new(0),
                manifests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeTools {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunFailure> {
            let mut out = CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            };
            if spec.program == "gs" {
                self.rasterize_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(ref err) = self.rasterize_stderr {
                    out.stderr = err.clone();
                    return Ok(out);
                }
                let pattern = std::path::PathBuf::from(&spec.args[4]);
                let dir = pattern.parent().unwrap().to_path_buf();
                for n in 1..=self.page_count {
                    std::fs::write(dir.join(format!("{n}.png")), b"png").unwrap();
                }
            } else {
                let cwd = spec.cwd.clone().unwrap();
                let manifest = std::fs::read_to_string(cwd.join(&spec.args[0])).unwrap();
                self.manifests.lock().unwrap().push(manifest);
                if self.ocr_times_out {
                    return Err(RunFailure::TimedOut);
                }
                if let Some(ref err) = self.ocr_stderr {
                    out.stderr = err.clone();
                    return Ok(out);
                }
                out.stdout = self.ocr_text.clone();
            }
            Ok(out)
        }
    }
}
