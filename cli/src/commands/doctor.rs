//! `agentify doctor`: probe the build toolchain and optionally install what
//! is missing.

use std::process::ExitCode;

use agentify_common::BuildTarget;
use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::toolchain::{InstallLocks, detect, install_missing};
use crate::domain::toolchain::{ToolchainCatalog, ToolchainStatus, missing_for};

/// Arguments for the doctor command.
#[derive(Args)]
pub struct DoctorArgs {
    /// Only check the tools this build target needs
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    /// Install missing tools with the system package manager
    #[arg(long)]
    pub install: bool,
}

/// Build target selector for `--target`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TargetArg {
    Native,
    Bytecode,
}

impl From<TargetArg> for BuildTarget {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Native => Self::NativeModule,
            TargetArg::Bytecode => Self::BytecodeModule,
        }
    }
}

/// Run the doctor command.
///
/// Exits non-zero when a required tool is still missing at the end.
///
/// # Errors
///
/// Returns an error if installation is requested in production mode or the
/// confirmation prompt fails.
pub async fn run(app: &AppContext, args: &DoctorArgs) -> Result<ExitCode> {
    let runner = app.runner();
    let catalog = ToolchainCatalog::builtin();
    let targets: Vec<BuildTarget> = match args.target {
        Some(t) => vec![t.into()],
        None => vec![BuildTarget::NativeModule, BuildTarget::BytecodeModule],
    };

    let mut statuses = detect(&runner, &catalog).await;
    let mut missing = missing_across(&catalog, &statuses, &targets);

    if args.install && !missing.is_empty() {
        if !app.env.allow_tool_install {
            anyhow::bail!("Tool installation is disabled in production mode");
        }
        let prompt = format!("Install {}?", missing.join(", "));
        if app.confirm(&prompt, true)? {
            let installer = app.installer();
            let locks = InstallLocks::new();
            if let Err(e) = install_missing(&runner, &installer, &locks, &catalog, &missing).await {
                app.output.warn(&e.to_string());
            }
            statuses = detect(&runner, &catalog).await;
            missing = missing_across(&catalog, &statuses, &targets);
        }
    }

    app.renderer().render_toolchain(&statuses, &missing)?;
    Ok(if missing.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn missing_across(
    catalog: &ToolchainCatalog,
    statuses: &[ToolchainStatus],
    targets: &[BuildTarget],
) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for target in targets {
        for name in missing_for(catalog, statuses, *target) {
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
    }
    missing
}
