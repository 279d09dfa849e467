//! Infrastructure implementations of the `ToolInstaller` port.

use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::OnceCell;

use crate::application::ports::{CommandRunner, ToolInstaller};
use crate::domain::toolchain::{PackageManager, ToolRequirement};

/// Package installs can download a lot; give them room.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

const MANAGER_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Installs tools through the host package manager (`apt-get`, `dnf` or
/// `brew`, first one found).
pub struct PackageManagerInstaller<R> {
    runner: R,
    manager: OnceCell<Option<PackageManager>>,
}

impl<R: CommandRunner> PackageManagerInstaller<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            manager: OnceCell::new(),
        }
    }

    /// Use `manager` without probing the host.
    #[must_use]
    pub fn with_manager(runner: R, manager: PackageManager) -> Self {
        Self {
            runner,
            manager: OnceCell::new_with(Some(Some(manager))),
        }
    }

    async fn manager(&self) -> Option<PackageManager> {
        *self
            .manager
            .get_or_init(|| async {
                for candidate in PackageManager::ALL {
                    let found = self
                        .runner
                        .run_with_timeout(candidate.program(), &["--version"], MANAGER_PROBE_TIMEOUT)
                        .await
                        .is_ok_and(|out| out.status.success());
                    if found {
                        tracing::debug!(manager = candidate.program(), "package manager found");
                        return Some(candidate);
                    }
                }
                None
            })
            .await
    }
}

impl<R: CommandRunner> ToolInstaller for PackageManagerInstaller<R> {
    async fn install(&self, tool: &ToolRequirement) -> Result<()> {
        let Some(manager) = self.manager().await else {
            bail!("no supported package manager found (tried apt-get, dnf, brew)");
        };
        let package = tool.package_for(manager);
        let args = manager.install_args(package);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::info!(tool = %tool.name, manager = manager.program(), package, "installing");

        let output = self
            .runner
            .run_with_timeout(manager.program(), &args, INSTALL_TIMEOUT)
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("no output");
            bail!("{} install {package} failed: {last}", manager.program());
        }
        Ok(())
    }
}

/// Installer for hosts where self-install is not allowed; always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstaller;

impl ToolInstaller for NoopInstaller {
    async fn install(&self, tool: &ToolRequirement) -> Result<()> {
        bail!("installing {} is not supported in this environment", tool.name)
    }
}
