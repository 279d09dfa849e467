//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Async ports return `Send` futures so a whole compile can run on its own
//! tokio task.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use crate::domain::config::AgentifyConfig;
use crate::domain::record::ProgressEvent;
use crate::domain::toolchain::ToolRequirement;

// ── Cancellation ──────────────────────────────────────────────────────────────

/// `true` (or a dropped sender) means the caller abandoned the request.
pub type CancelSignal = watch::Receiver<bool>;

/// Resolve once `cancel` fires. A dropped sender counts as cancellation.
pub async fn wait_cancelled(cancel: &mut CancelSignal) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Non-blocking check of `cancel`.
#[must_use]
pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

// ── Value Types ───────────────────────────────────────────────────────────────

/// A process to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// `program arg1 arg2 …` for log lines.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a streamed process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited { code: Option<i32>, success: bool },
    /// The timeout fired and the process was killed.
    TimedOut,
    /// The cancel signal fired and the process was killed.
    Cancelled,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> impl Future<Output = Result<Output>> + Send;

    /// Run a process, forwarding every stdout/stderr line to `lines` as it
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned. Timeout and
    /// cancellation are reported as [`RunOutcome`] variants; in both cases the
    /// child must be killed before returning.
    fn run_streaming(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        cancel: CancelSignal,
        lines: mpsc::UnboundedSender<String>,
    ) -> impl Future<Output = Result<RunOutcome>> + Send;
}

// ── Progress Port ─────────────────────────────────────────────────────────────

/// Push hook invoked after every compile state transition. Sync trait; the
/// sink decides how (and whether) to deliver.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

// ── Toolchain Install Port ────────────────────────────────────────────────────

/// Host-wide tool installation capability.
pub trait ToolInstaller: Send + Sync {
    /// Install `tool` via the host's package mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the tool could not be installed.
    fn install(&self, tool: &ToolRequirement) -> impl Future<Output = Result<()>> + Send;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Abstracts local filesystem access for rendering and artifact checks.
pub trait LocalFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// # Errors
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// # Errors
    /// Returns an error if the directory cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    fn is_empty_dir(&self, path: &Path) -> Result<bool>;
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
    /// # Errors
    /// Returns an error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// # Errors
    /// Returns an error if the config file exists but cannot be read or parsed.
    fn load(&self) -> Result<AgentifyConfig>;
    /// # Errors
    /// Returns an error if the config file cannot be written.
    fn save(&self, config: &AgentifyConfig) -> Result<()>;
    /// # Errors
    /// Returns an error if the config location cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
