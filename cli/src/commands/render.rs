//! `agentify render`: write the generated source tree without building it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::render::render_to_dir;
use crate::domain::catalog::ToolCatalog;
use crate::domain::normalize::{RandomIds, normalize};
use crate::domain::render::module_name;
use crate::domain::templates::TemplateSet;
use crate::infra::fs::StdFs;

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Agent configuration file (JSON or YAML, `-` for stdin)
    pub file: PathBuf,

    /// Output directory; an earlier render there is replaced [default: ./<module name>]
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Run the render command.
///
/// # Errors
///
/// Returns an error if the input is invalid or the tree cannot be written.
pub fn run(app: &AppContext, args: &RenderArgs) -> Result<ExitCode> {
    let raw = super::read_config_input(&args.file)?;
    let descriptor = normalize(&raw, &ToolCatalog::builtin(), &RandomIds)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(module_name(&descriptor.agent_name)));
    if out.is_dir() && !app.confirm(&format!("Replace {}?", out.display()), true)? {
        app.output.info("Render cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let generated_at = app.env.stamp_timestamps.then(Utc::now);
    let rendered = render_to_dir(
        &StdFs,
        &descriptor,
        &TemplateSet::builtin(),
        &out,
        generated_at,
    )?;
    app.renderer().render_tree(&rendered)?;
    Ok(ExitCode::SUCCESS)
}
