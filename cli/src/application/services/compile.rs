//! Application service: the compilation orchestrator.
//!
//! Sequences normalize → inspect → (install) → render → build and owns the
//! [`CompilationRecord`]. Every failure after validation resolves to a
//! terminal record; `compile` itself never returns an error.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::PathBuf;
use std::sync::Arc;

use agentify_common::AgentPluginDescriptor;
use anyhow::Context as _;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;

use crate::application::ports::{
    CancelSignal, CommandRunner, LocalFs, ProgressSink, ToolInstaller, is_cancelled,
    wait_cancelled,
};
use crate::application::services::build::{build, build_plan};
use crate::application::services::render::render_to_dir;
use crate::application::services::toolchain::{InstallLocks, detect_for, install_missing};
use crate::domain::catalog::ToolCatalog;
use crate::domain::config::ExecutionEnvironment;
use crate::domain::error::{BuildError, ToolchainError};
use crate::domain::normalize::{IdSource, RandomIds, normalize};
use crate::domain::record::{
    CompilationRecord, CompileOutcome, CompileState, FailureReason, MOCK_MARKER, ProgressEvent,
};
use crate::domain::render::module_name;
use crate::domain::templates::TemplateSet;
use crate::domain::toolchain::{ToolchainCatalog, missing_for};

/// File name of the placeholder written in degraded mode.
pub const MOCK_ARTIFACT: &str = "agent.mock";

/// Orchestrates compile requests. Cheap to clone; clones share the build pool
/// and install locks.
pub struct CompileService<R, F, I, P> {
    runner: Arc<R>,
    fs: Arc<F>,
    installer: Arc<I>,
    progress: Arc<P>,
    catalog: Arc<ToolCatalog>,
    toolchain: Arc<ToolchainCatalog>,
    templates: Arc<TemplateSet>,
    ids: Arc<dyn IdSource>,
    env: Arc<ExecutionEnvironment>,
    pool: Arc<Semaphore>,
    locks: InstallLocks,
}

impl<R, F, I, P> Clone for CompileService<R, F, I, P> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            fs: Arc::clone(&self.fs),
            installer: Arc::clone(&self.installer),
            progress: Arc::clone(&self.progress),
            catalog: Arc::clone(&self.catalog),
            toolchain: Arc::clone(&self.toolchain),
            templates: Arc::clone(&self.templates),
            ids: Arc::clone(&self.ids),
            env: Arc::clone(&self.env),
            pool: Arc::clone(&self.pool),
            locks: self.locks.clone(),
        }
    }
}

impl<R, F, I, P> CompileService<R, F, I, P>
where
    R: CommandRunner,
    F: LocalFs,
    I: ToolInstaller,
    P: ProgressSink,
{
    /// Service with the built-in catalogs, templates and random IDs.
    #[must_use]
    pub fn new(runner: R, fs: F, installer: I, progress: P, env: ExecutionEnvironment) -> Self {
        Self {
            runner: Arc::new(runner),
            fs: Arc::new(fs),
            installer: Arc::new(installer),
            progress: Arc::new(progress),
            catalog: Arc::new(ToolCatalog::builtin()),
            toolchain: Arc::new(ToolchainCatalog::builtin()),
            templates: Arc::new(TemplateSet::builtin()),
            ids: Arc::new(RandomIds),
            pool: Arc::new(Semaphore::new(env.build_concurrency.max(1))),
            env: Arc::new(env),
            locks: InstallLocks::new(),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain: ToolchainCatalog) -> Self {
        self.toolchain = Arc::new(toolchain);
        self
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    #[must_use]
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Share install locks with another service instance.
    #[must_use]
    pub fn with_locks(mut self, locks: InstallLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.env
    }

    /// Run one compile request to a terminal state.
    pub async fn compile(&self, raw: &Value, mut cancel: CancelSignal) -> CompileOutcome {
        let mut run = Run {
            record: CompilationRecord::new(self.ids.next_id()),
            progress: &*self.progress,
        };

        run.enter(CompileState::Normalizing, "normalizing configuration");
        let descriptor = match normalize(raw, &self.catalog, &*self.ids) {
            Ok(d) => d,
            Err(e) => return run.fail(FailureReason::Validation(e.violations.join("; "))),
        };
        run.record.agent_id = Some(descriptor.agent_id.clone());
        run.record.log(format!(
            "descriptor {} ({}) with {} tool(s), {} resource(s), target {}",
            descriptor.agent_name,
            descriptor.agent_id,
            descriptor.tools.len(),
            descriptor.resources.len(),
            descriptor.build_target
        ));

        let working_dir = self
            .env
            .output_root
            .join(format!("{}-{}", descriptor.agent_id, run.record.request_id));

        // Inspect, install at most once, inspect again.
        loop {
            if is_cancelled(&cancel) {
                return run.fail(FailureReason::Cancelled);
            }
            run.enter(CompileState::Inspecting, "checking build toolchain");
            let statuses =
                detect_for(&*self.runner, &self.toolchain, descriptor.build_target).await;
            for s in &statuses {
                run.record.log(match (&s.version, &s.detail) {
                    (_, Some(detail)) if !s.available => {
                        format!("{}: unavailable ({detail})", s.name)
                    }
                    (Some(v), _) => format!("{}: {v}", s.name),
                    _ => format!("{}: available", s.name),
                });
            }
            let missing = missing_for(&self.toolchain, &statuses, descriptor.build_target);
            if missing.is_empty() {
                run.enter(CompileState::Ready, "toolchain ready");
                break;
            }

            let missing_err = if run.record.install_attempted() {
                ToolchainError::StillMissing(missing.clone())
            } else {
                ToolchainError::Missing(missing.clone())
            };
            run.enter(CompileState::ToolchainMissing, &missing_err.to_string());

            if !self.env.allow_tool_install {
                let why = ToolchainError::InstallDisabled.to_string();
                return self.degrade(run, &descriptor, &working_dir, &why);
            }
            if !run.record.begin_install() {
                return self.degrade(run, &descriptor, &working_dir, &missing_err.to_string());
            }

            run.enter(
                CompileState::Installing,
                &format!("installing {}", missing.join(", ")),
            );
            if let Err(e) = install_missing(
                &*self.runner,
                &*self.installer,
                &self.locks,
                &self.toolchain,
                &missing,
            )
            .await
            {
                return self.degrade(run, &descriptor, &working_dir, &e.to_string());
            }
            run.record.log("install finished; re-checking toolchain");
        }

        if is_cancelled(&cancel) {
            return run.fail(FailureReason::Cancelled);
        }
        run.enter(
            CompileState::Rendering,
            &format!("rendering sources into {}", working_dir.display()),
        );
        let generated_at = self.env.stamp_timestamps.then(Utc::now);
        let rendered = match render_to_dir(
            &*self.fs,
            &descriptor,
            &self.templates,
            &working_dir,
            generated_at,
        ) {
            Ok(r) => r,
            Err(e) => return run.fail(FailureReason::Template(e.to_string())),
        };
        run.record.log(format!("wrote {} file(s)", rendered.tree.files.len()));

        let plan = build_plan(&rendered, &descriptor.isolation, self.env.default_build_timeout_secs);

        // Wait for a build slot without ignoring cancellation.
        let permit = tokio::select! {
            permit = Arc::clone(&self.pool).acquire_owned() => permit,
            () = wait_cancelled(&mut cancel) => return run.fail(FailureReason::Cancelled),
        };
        let _permit = match permit {
            Ok(p) => p,
            Err(e) => return run.fail(FailureReason::Io(format!("build pool closed: {e}"))),
        };

        run.enter(
            CompileState::Building,
            &format!(
                "building {} (timeout {}s)",
                descriptor.build_target,
                plan.timeout.as_secs()
            ),
        );
        match build(&*self.runner, &*self.fs, &plan, cancel, &mut run.record).await {
            Ok(artifact) => run.succeed(artifact),
            Err(BuildError::Cancelled { .. }) => run.fail(FailureReason::Cancelled),
            Err(e) => {
                let tail = e.tail();
                if !tail.is_empty() {
                    tracing::debug!(lines = tail.len(), last = ?tail.last(), "build output tail");
                }
                run.fail(FailureReason::Build(e.to_string()))
            }
        }
    }

    /// Spawn [`compile`](Self::compile) on its own task.
    pub fn submit(&self, raw: Value) -> CompileHandle
    where
        R: 'static,
        F: 'static,
        I: 'static,
        P: 'static,
    {
        let (tx, rx) = watch::channel(false);
        let service = self.clone();
        let task = tokio::spawn(async move { service.compile(&raw, rx).await });
        CompileHandle { cancel: tx, task }
    }

    fn degrade(
        &self,
        run: Run<'_, P>,
        descriptor: &AgentPluginDescriptor,
        working_dir: &std::path::Path,
        why: &str,
    ) -> CompileOutcome {
        tracing::warn!(
            agent = %descriptor.agent_name,
            reason = why,
            "toolchain unavailable, producing placeholder"
        );
        let placeholder = working_dir.join(MOCK_ARTIFACT);
        let body = format!(
            "{MOCK_MARKER} placeholder for {} ({}); no real {} build was performed: {why}\n",
            descriptor.agent_name,
            module_name(&descriptor.agent_name),
            descriptor.build_target
        );
        let written = self
            .fs
            .create_dir_all(working_dir)
            .and_then(|()| self.fs.write(&placeholder, body.as_bytes()))
            .with_context(|| format!("writing placeholder {}", placeholder.display()));
        match written {
            Ok(()) => run.degrade(placeholder, why),
            Err(e) => run.fail(FailureReason::Io(format!("{e:#}"))),
        }
    }
}

/// Handle to a compile running on its own task.
pub struct CompileHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<CompileOutcome>,
}

impl CompileHandle {
    /// Ask the compile to stop; a running build process is killed.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// A second sender-side handle, e.g. for a Ctrl-C watcher.
    #[must_use]
    pub fn canceller(&self) -> watch::Sender<bool> {
        self.cancel.clone()
    }

    /// Wait for the terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only if the compile task panicked.
    pub async fn wait(self) -> anyhow::Result<CompileOutcome> {
        // Keep the sender alive: dropping it would read as cancellation.
        let Self { cancel, task } = self;
        let outcome = task.await.context("compile task panicked");
        drop(cancel);
        outcome
    }
}

/// One in-flight request: the record plus the sink its transitions go to.
struct Run<'a, P: ProgressSink> {
    record: CompilationRecord,
    progress: &'a P,
}

impl<P: ProgressSink> Run<'_, P> {
    fn enter(&mut self, state: CompileState, message: &str) {
        if self.record.advance(state) {
            self.record.log(format!("{state}: {message}"));
            tracing::info!(request_id = %self.record.request_id, %state, "{message}");
            self.progress.emit(&ProgressEvent::from_record(&self.record, message));
        }
    }

    fn succeed(mut self, artifact: PathBuf) -> CompileOutcome {
        let message = format!("artifact ready at {}", artifact.display());
        self.record.succeed(artifact);
        self.finish(&message)
    }

    fn degrade(mut self, placeholder: PathBuf, why: &str) -> CompileOutcome {
        let message = format!("{MOCK_MARKER} degraded: {why}");
        self.record.degrade(placeholder, why);
        self.finish(&message)
    }

    fn fail(mut self, reason: FailureReason) -> CompileOutcome {
        let message = reason.to_string();
        tracing::info!(request_id = %self.record.request_id, %message, "compile failed");
        self.record.fail(reason);
        self.finish(&message)
    }

    fn finish(self, message: &str) -> CompileOutcome {
        self.progress.emit(&ProgressEvent::from_record(&self.record, message));
        CompileOutcome::from(self.record)
    }
}
