//! `agentify normalize`: print the canonical descriptor for a configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::domain::catalog::ToolCatalog;
use crate::domain::normalize::{RandomIds, normalize};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Agent configuration file (JSON or YAML, `-` for stdin)
    pub file: PathBuf,
}

/// Run the normalize command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or fails validation.
pub fn run(app: &AppContext, args: &NormalizeArgs) -> Result<ExitCode> {
    let raw = super::read_config_input(&args.file)?;
    let descriptor = normalize(&raw, &ToolCatalog::builtin(), &RandomIds)?;
    app.renderer().render_descriptor(&descriptor)?;
    Ok(ExitCode::SUCCESS)
}
