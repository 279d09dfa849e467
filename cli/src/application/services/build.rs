//! Application service: drive the external compiler against a rendered tree.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Output lines are appended to the compilation record as they arrive.

use std::collections::VecDeque;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;
use std::time::Duration;

use agentify_common::{BuildTarget, IsolationLimits};
use tokio::sync::mpsc;

use crate::application::ports::{CancelSignal, CommandRunner, CommandSpec, LocalFs, RunOutcome};
use crate::application::services::render::RenderedSourceTree;
use crate::domain::error::BuildError;
use crate::domain::record::CompilationRecord;
use crate::domain::render::PY_PACKAGE;

/// Number of trailing output lines kept on a failed build.
pub const TAIL_LINES: usize = 20;

/// What to run and where the result will be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub command: CommandSpec,
    pub artifact: PathBuf,
    pub timeout: Duration,
}

/// Wall-clock budget: the declared limit, or `fallback_secs` when none is
/// declared. Never longer than a non-zero declared limit.
#[must_use]
pub fn build_timeout(isolation: &IsolationLimits, fallback_secs: u64) -> Duration {
    let secs = match isolation.time_limit_secs {
        0 => fallback_secs.max(1),
        declared => declared,
    };
    Duration::from_secs(secs)
}

/// Parallel jobs for `cargo`: the CPU limit rounded up, at least one.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn build_jobs(isolation: &IsolationLimits) -> u32 {
    let cores = isolation.cpu_cores.ceil();
    if cores.is_finite() && cores >= 1.0 {
        cores.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Compiler invocation and expected artifact for `rendered`.
#[must_use]
pub fn build_plan(
    rendered: &RenderedSourceTree,
    isolation: &IsolationLimits,
    fallback_secs: u64,
) -> BuildPlan {
    let root = &rendered.root;
    let timeout = build_timeout(isolation, fallback_secs);
    match rendered.tree.target {
        BuildTarget::NativeModule => {
            let target_dir = root.join("target");
            let command = CommandSpec::new(
                "cargo",
                [
                    "build".to_string(),
                    "--release".to_string(),
                    "--offline".to_string(),
                    "--manifest-path".to_string(),
                    root.join("Cargo.toml").display().to_string(),
                    "--target-dir".to_string(),
                    target_dir.display().to_string(),
                    "-j".to_string(),
                    build_jobs(isolation).to_string(),
                ],
            )
            .current_dir(root);
            let artifact = target_dir.join("release").join(format!(
                "{DLL_PREFIX}{}{DLL_SUFFIX}",
                rendered.tree.module_name
            ));
            BuildPlan {
                command,
                artifact,
                timeout,
            }
        }
        BuildTarget::BytecodeModule => {
            let package = root.join(PY_PACKAGE);
            let command = CommandSpec::new(
                "python3",
                [
                    "-m".to_string(),
                    "compileall".to_string(),
                    "-q".to_string(),
                    package.display().to_string(),
                ],
            )
            .current_dir(root);
            BuildPlan {
                command,
                artifact: package,
                timeout,
            }
        }
    }
}

/// Run `plan`, streaming output into `record`.
///
/// # Errors
///
/// Returns a [`BuildError`] on spawn failure, non-zero exit, timeout,
/// cancellation, or when the expected artifact is absent after a clean exit.
pub async fn build(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    plan: &BuildPlan,
    cancel: CancelSignal,
    record: &mut CompilationRecord,
) -> Result<PathBuf, BuildError> {
    record.log(format!("$ {}", plan.command.display()));

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
    let mut keep = |record: &mut CompilationRecord, line: String| {
        if tail.len() == TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.clone());
        record.log(line);
    };

    let run = runner.run_streaming(&plan.command, plan.timeout, cancel, tx);
    tokio::pin!(run);
    let result = loop {
        tokio::select! {
            Some(line) = rx.recv() => keep(record, line),
            result = &mut run => break result,
        }
    };
    while let Ok(line) = rx.try_recv() {
        keep(record, line);
    }
    let tail: Vec<String> = tail.into_iter().collect();

    match result {
        Err(e) => Err(BuildError::Spawn(format!("{e:#}"))),
        Ok(RunOutcome::Exited { success: true, .. }) => {
            if fs.exists(&plan.artifact) {
                Ok(plan.artifact.clone())
            } else {
                Err(BuildError::MissingArtifact(plan.artifact.clone()))
            }
        }
        Ok(RunOutcome::Exited { code, .. }) => Err(BuildError::Exit { code, tail }),
        Ok(RunOutcome::TimedOut) => Err(BuildError::Timeout {
            secs: plan.timeout.as_secs(),
            tail,
        }),
        Ok(RunOutcome::Cancelled) => Err(BuildError::Cancelled { tail }),
    }
}
