//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use agentify_common::AgentPluginDescriptor;
use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::{JsonLinesReporter, Reporter, TerminalReporter};
pub use styles::Styles;

use crate::application::services::render::RenderedSourceTree;
use crate::domain::config::{AgentifyConfig, ExecutionEnvironment};
use crate::domain::record::CompileOutcome;
use crate::domain::toolchain::ToolchainStatus;

/// Renderer for the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({ "version": version })),
        }
    }

    /// Render a compile outcome, including the full record in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_outcome(&self, outcome: &CompileOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_outcome(outcome);
                Ok(())
            }
            Self::Json(r) => r.render(outcome),
        }
    }

    /// Render a normalized descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_descriptor(&self, descriptor: &AgentPluginDescriptor) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_descriptor(descriptor);
                Ok(())
            }
            Self::Json(r) => r.render(descriptor),
        }
    }

    /// Render a written source tree.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_tree(&self, rendered: &RenderedSourceTree) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_tree(rendered);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({
                "root": rendered.root,
                "target": rendered.tree.target,
                "module": rendered.tree.module_name,
                "files": rendered.tree.files.keys().collect::<Vec<_>>(),
            })),
        }
    }

    /// Render toolchain probe results.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_toolchain(&self, statuses: &[ToolchainStatus], missing: &[String]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_toolchain(statuses, missing);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({
                "status": if missing.is_empty() { "ready" } else { "degraded" },
                "tools": statuses,
                "missing": missing,
            })),
        }
    }

    /// Render the stored configuration and the effective environment.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(
        &self,
        config: &AgentifyConfig,
        path: &Path,
        env: &ExecutionEnvironment,
    ) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(config, path, env);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({
                "path": path,
                "config": config,
                "effective": env,
            })),
        }
    }
}

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}
