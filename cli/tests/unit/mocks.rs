//! Shared mock infrastructure for unit tests.
//!
//! Provides a scripted [`CommandRunner`], an installer that flips tools to
//! available, a recording progress sink and a deterministic ID source so each
//! test file doesn't have to re-define the same boilerplate.

#![allow(clippy::expect_used, dead_code)]

use std::collections::HashSet;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentify_cli::application::ports::{
    CancelSignal, CommandRunner, CommandSpec, ProgressSink, RunOutcome, ToolInstaller,
    wait_cancelled,
};
use agentify_cli::domain::config::ExecutionEnvironment;
use agentify_cli::domain::normalize::IdSource;
use agentify_cli::domain::record::ProgressEvent;
use agentify_cli::domain::toolchain::ToolRequirement;
use anyhow::Result;
use serde_json::{Value, json};
use tokio::sync::mpsc;

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(stderr: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(1 << 8),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Scenario A input, optionally retargeted.
pub fn starbucks_helper(target: &str) -> Value {
    json!({
        "name": "Starbucks Helper",
        "personality": "friendly",
        "instructions": "help customers",
        "settings": {"mcpServers": []},
        "features": {"chat": true},
        "buildTarget": target,
    })
}

pub fn env_at(root: &Path, allow_tool_install: bool) -> ExecutionEnvironment {
    ExecutionEnvironment {
        output_root: root.to_path_buf(),
        allow_tool_install,
        build_concurrency: 2,
        default_build_timeout_secs: 1,
        stamp_timestamps: false,
    }
}

// ── Toolchain state shared by runner and installer ────────────────────────────

/// Which programs answer their version probe.
#[derive(Clone, Default)]
pub struct Toolchain {
    installed: Arc<Mutex<HashSet<String>>>,
}

impl Toolchain {
    pub fn with(programs: &[&str]) -> Self {
        let tc = Self::default();
        for p in programs {
            tc.add(p);
        }
        tc
    }

    pub fn full() -> Self {
        Self::with(&["cargo", "rustc", "cc", "python3"])
    }

    pub fn add(&self, program: &str) {
        self.installed
            .lock()
            .expect("lock")
            .insert(program.to_string());
    }

    pub fn has(&self, program: &str) -> bool {
        self.installed.lock().expect("lock").contains(program)
    }
}

fn version_banner(program: &str) -> &'static str {
    match program {
        "cargo" => "cargo 1.80.0 (376290515 2024-07-16)",
        "rustc" => "rustc 1.80.0 (051478957 2024-07-21)",
        "cc" => "cc (Debian 12.2.0-14) 12.2.0",
        "python3" => "Python 3.11.2",
        _ => "unknown 0.0.0",
    }
}

// ── Mock: command runner ──────────────────────────────────────────────────────

/// What the build command does when run.
#[derive(Clone, Debug)]
pub enum BuildScript {
    /// Print `lines` and exit 0.
    Succeed { lines: Vec<String> },
    /// Print `lines` and exit with `code`.
    Fail { code: i32, lines: Vec<String> },
    /// Never exit on its own.
    Hang,
}

/// Scripted runner: version probes consult the shared [`Toolchain`], builds
/// follow a [`BuildScript`].
#[derive(Clone)]
pub struct MockRunner {
    pub toolchain: Toolchain,
    script: BuildScript,
    probes: Arc<AtomicUsize>,
    builds: Arc<Mutex<Vec<CommandSpec>>>,
}

impl MockRunner {
    pub fn new(toolchain: Toolchain, script: BuildScript) -> Self {
        Self {
            toolchain,
            script,
            probes: Arc::new(AtomicUsize::new(0)),
            builds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding(toolchain: Toolchain) -> Self {
        Self::new(
            toolchain,
            BuildScript::Succeed {
                lines: vec!["Compiling agent".to_string()],
            },
        )
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn builds(&self) -> Vec<CommandSpec> {
        self.builds.lock().expect("lock").clone()
    }
}

impl CommandRunner for MockRunner {
    async fn run_with_timeout(
        &self,
        program: &str,
        _args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.toolchain.has(program) {
            Ok(ok_output(version_banner(program).as_bytes()))
        } else {
            anyhow::bail!("failed to run {program}: No such file or directory")
        }
    }

    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        mut cancel: CancelSignal,
        lines: mpsc::UnboundedSender<String>,
    ) -> Result<RunOutcome> {
        self.builds.lock().expect("lock").push(spec.clone());
        match &self.script {
            BuildScript::Succeed { lines: out } => {
                for l in out {
                    let _ = lines.send(l.clone());
                }
                Ok(RunOutcome::Exited {
                    code: Some(0),
                    success: true,
                })
            }
            BuildScript::Fail { code, lines: out } => {
                for l in out {
                    let _ = lines.send(l.clone());
                }
                Ok(RunOutcome::Exited {
                    code: Some(*code),
                    success: false,
                })
            }
            BuildScript::Hang => {
                tokio::select! {
                    () = tokio::time::sleep(timeout) => Ok(RunOutcome::TimedOut),
                    () = wait_cancelled(&mut cancel) => Ok(RunOutcome::Cancelled),
                }
            }
        }
    }
}

// ── Mock: installer ───────────────────────────────────────────────────────────

/// Installer that either makes the tool available or fails.
#[derive(Clone)]
pub struct MockInstaller {
    toolchain: Toolchain,
    succeed: bool,
    calls: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockInstaller {
    pub fn working(toolchain: &Toolchain) -> Self {
        Self {
            toolchain: toolchain.clone(),
            succeed: true,
            calls: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn broken(toolchain: &Toolchain) -> Self {
        Self {
            succeed: false,
            ..Self::working(toolchain)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    /// Most `install` calls ever in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ToolInstaller for MockInstaller {
    async fn install(&self, tool: &ToolRequirement) -> Result<()> {
        self.calls.lock().expect("lock").push(tool.name.clone());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        // Let concurrent requests overlap inside the install lock.
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        if !self.succeed {
            anyhow::bail!("no package manager found");
        }
        self.toolchain.add(&tool.program);
        Ok(())
    }
}

// ── Mock: progress sink ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("lock").clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: &ProgressEvent) {
        self.events.lock().expect("lock").push(event.clone());
    }
}

// ── Mock: ID source ───────────────────────────────────────────────────────────

/// `prefix-1`, `prefix-2`, …
pub struct SeqIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl SeqIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicUsize::new(1),
        }
    }
}

impl IdSource for SeqIds {
    fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}
