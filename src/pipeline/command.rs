//! Subprocess seam for the external rasteriser and OCR engine.
//!
//! Each stage builds a [`CommandSpec`] and hands it to a [`CommandRunner`].
//! The production runner spawns the program with `tokio::process`, captures
//! both output streams and enforces the per-step watchdog. Tests substitute
//! a scripted runner so the pipeline can run without the real tools.

use crate::error::StageError;
use crate::queue::JobStage;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child; inherits ours when `None`.
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// What a finished child left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Apply the stage success rule: exit code 0 and nothing on stderr.
    ///
    /// The raw stderr text becomes the failure detail so that it reaches the
    /// client's `failReason` unchanged.
    pub fn check(self, stage: JobStage) -> Result<Self, StageError> {
        if !self.stderr.trim().is_empty() {
            return Err(StageError::Failed {
                stage,
                detail: self.stderr.trim_end().to_string(),
            });
        }
        match self.exit_code {
            Some(0) => Ok(self),
            Some(code) => Err(StageError::Failed {
                stage,
                detail: format!("exited with status {code}"),
            }),
            None => Err(StageError::Failed {
                stage,
                detail: "terminated by signal".to_string(),
            }),
        }
    }
}

/// Why a command produced no [`CommandOutput`].
#[derive(Debug, Error)]
pub enum RunFailure {
    /// The program could not be started.
    #[error("spawn failed: {0}")]
    Spawn(std::io::Error),
    /// The watchdog fired; the child has been killed.
    #[error("timed out")]
    TimedOut,
    /// Collecting output from a running child failed.
    #[error("output collection failed: {0}")]
    Io(std::io::Error),
}

impl RunFailure {
    pub fn into_stage_error(self, stage: JobStage, spec: &CommandSpec) -> StageError {
        match self {
            Self::Spawn(e) => StageError::Spawn {
                stage,
                program: spec.program.clone(),
                detail: e.to_string(),
            },
            Self::TimedOut => StageError::Timeout {
                stage,
                secs: spec.timeout.as_secs(),
            },
            Self::Io(e) => StageError::Failed {
                stage,
                detail: format!("reading output of '{}': {e}", spec.program),
            },
        }
    }
}

/// Runs a [`CommandSpec`] to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunFailure>;
}

/// Run `spec` for `stage` and apply the stage success rule.
pub async fn run_stage(
    runner: &dyn CommandRunner,
    stage: JobStage,
    spec: &CommandSpec,
) -> Result<CommandOutput, StageError> {
    debug!("{}: running {} {:?}", stage, spec.program, spec.args);
    let output = runner
        .run(spec)
        .await
        .map_err(|f| f.into_stage_error(stage, spec))?;
    output.check(stage).inspect_err(|e| warn!("{}", e))
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunFailure> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = spec.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(RunFailure::Spawn)?;

        // On timeout the future owning the child is dropped, and kill_on_drop
        // reaps it.
        let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RunFailure::Io(e)),
            Err(_) => return Err(RunFailure::TimedOut),
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
