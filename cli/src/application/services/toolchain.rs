//! Application service: toolchain detection and self-install.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All process execution is routed through the injected `CommandRunner`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use agentify_common::BuildTarget;
use futures_util::future::join_all;

use crate::application::ports::{CommandRunner, ToolInstaller};
use crate::domain::error::InstallError;
use crate::domain::toolchain::{ToolRequirement, ToolchainCatalog, ToolchainStatus, classify_probe};

/// Upper bound on a single `--version` probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Async mutexes serializing installs across concurrent compiles.
///
/// Each tool has its own lock so a duplicate install can be skipped, and one
/// host-wide lock is held around every package manager invocation, since
/// apt-get and dnf refuse to run concurrently. Clones share the same locks.
#[derive(Debug, Default, Clone)]
pub struct InstallLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    host: Arc<tokio::sync::Mutex<()>>,
}

impl InstallLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding installs of `tool`.
    #[must_use]
    pub fn lock_for(&self, tool: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(tool.to_string()).or_default())
    }

    /// The lock held while the package manager runs.
    #[must_use]
    pub fn host(&self) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(&self.host)
    }
}

/// Probe one tool's version entrypoint.
pub async fn probe(runner: &impl CommandRunner, req: &ToolRequirement) -> ToolchainStatus {
    let args: Vec<&str> = req.version_args.iter().map(String::as_str).collect();
    match runner.run_with_timeout(&req.program, &args, PROBE_TIMEOUT).await {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            let status = classify_probe(req, output.status.success(), &text);
            tracing::debug!(
                tool = %req.name,
                available = status.available,
                version = ?status.version,
                "probed"
            );
            status
        }
        Err(e) => {
            tracing::debug!(tool = %req.name, error = %e, "probe failed");
            ToolchainStatus::unavailable(&req.name, format!("{e:#}"))
        }
    }
}

/// Probe every tool in `catalog` concurrently. Results keep catalog order.
pub async fn detect(
    runner: &impl CommandRunner,
    catalog: &ToolchainCatalog,
) -> Vec<ToolchainStatus> {
    join_all(catalog.iter().map(|req| probe(runner, req))).await
}

/// Probe only the tools `target` needs.
pub async fn detect_for(
    runner: &impl CommandRunner,
    catalog: &ToolchainCatalog,
    target: BuildTarget,
) -> Vec<ToolchainStatus> {
    join_all(catalog.required_for(target).map(|req| probe(runner, req))).await
}

/// Install each missing tool, best-effort.
///
/// Installs of the same tool are serialized through `locks`; once the lock is
/// held the tool is probed again so a concurrent request's install is not
/// repeated. At most one installer call runs at a time. A failed install does
/// not stop the others.
///
/// # Errors
///
/// Returns an [`InstallError`] listing every tool that still failed.
pub async fn install_missing(
    runner: &impl CommandRunner,
    installer: &impl ToolInstaller,
    locks: &InstallLocks,
    catalog: &ToolchainCatalog,
    missing: &[String],
) -> Result<(), InstallError> {
    let attempts = missing.iter().map(|name| async move {
        let Some(req) = catalog.get(name) else {
            return Err((name.clone(), "not in the toolchain catalog".to_string()));
        };
        let lock = locks.lock_for(name);
        let _guard = lock.lock().await;

        if probe(runner, req).await.available {
            tracing::debug!(tool = %name, "already installed by a concurrent request");
            return Ok(());
        }
        let host = locks.host();
        let _host_guard = host.lock().await;
        tracing::info!(tool = %name, "installing");
        installer
            .install(req)
            .await
            .map_err(|e| (name.clone(), format!("{e:#}")))
    });

    let failures: Vec<(String, String)> = join_all(attempts)
        .await
        .into_iter()
        .filter_map(Result::err)
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        for (tool, why) in &failures {
            tracing::warn!(%tool, reason = %why, "install failed");
        }
        Err(InstallError { failures })
    }
}
