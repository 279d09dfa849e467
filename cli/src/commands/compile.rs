//! `agentify compile`: run one configuration through the full pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::domain::record::RecordStatus;

/// Arguments for the compile command.
#[derive(Args)]
pub struct CompileArgs {
    /// Agent configuration file (JSON or YAML, `-` for stdin)
    pub file: PathBuf,
}

/// Run the compile command.
///
/// A degraded (mock-mode) result exits successfully; only a failed record
/// produces a non-zero exit code. Ctrl-C cancels the running build.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the result cannot be
/// rendered.
pub async fn run(app: &AppContext, args: &CompileArgs) -> Result<ExitCode> {
    let raw = super::read_config_input(&args.file)?;

    let handle = app.compiler().submit(raw);
    let canceller = handle.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling compile");
            let _ = canceller.send(true);
        }
    });

    let outcome = handle.wait().await;
    interrupt.abort();
    let outcome = outcome?;

    app.renderer().render_outcome(&outcome)?;
    Ok(match outcome.status {
        RecordStatus::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
