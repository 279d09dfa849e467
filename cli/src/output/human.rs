//! Human-readable terminal renderer.

use std::path::Path;

use agentify_common::{AgentPluginDescriptor, IsolationLimits};
use owo_colors::OwoColorize as _;

use crate::application::services::render::RenderedSourceTree;
use crate::domain::config::{AgentifyConfig, ExecutionEnvironment, VALID_CONFIG_KEYS};
use crate::domain::record::{CompileOutcome, RecordStatus};
use crate::domain::toolchain::ToolchainStatus;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("agentify v{version}"));
    }

    /// Render the final result of a compile request.
    pub fn render_outcome(&self, outcome: &CompileOutcome) {
        let record = &outcome.record;
        match outcome.status {
            RecordStatus::Succeeded => self.ctx.success(&format!(
                "Compiled {}",
                record.agent_id.as_deref().unwrap_or(&record.request_id)
            )),
            RecordStatus::Degraded => {
                self.ctx.warn("Compiled in mock mode (toolchain unavailable)");
                for line in record.mock_lines() {
                    self.ctx.kv("   ", line);
                }
            }
            RecordStatus::Failed => self.ctx.error(&format!(
                "Compilation failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            )),
            RecordStatus::Pending => self.ctx.warn("Compilation did not finish"),
        }
        if let Some(path) = &outcome.artifact_path {
            self.ctx.kv("Artifact:", &path.display().to_string());
        }
        self.ctx.kv("Request:", &record.request_id);
        self.ctx.kv("Status:", status_display(outcome.status));
    }

    /// Render a summary of a normalized descriptor.
    pub fn render_descriptor(&self, d: &AgentPluginDescriptor) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&d.display_name);
        println!();
        self.ctx.kv("Name:       ", &d.agent_name);
        self.ctx.kv("ID:         ", &d.agent_id);
        self.ctx.kv("Type:       ", d.agent_type.as_str());
        self.ctx.kv("Target:     ", d.build_target.as_str());
        self.ctx.kv("Isolation:  ", &format_isolation(&d.isolation));

        println!();
        println!("  {}", "Tools:".style(self.ctx.styles.bold));
        if d.tools.is_empty() {
            println!("    {}", "(none)".style(self.ctx.styles.dim));
        }
        for tool in &d.tools {
            let params = tool
                .parameters
                .iter()
                .map(|p| {
                    if p.required {
                        p.name.clone()
                    } else {
                        format!("{}?", p.name)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!("    {:<20} ({params}) -> {}", tool.name, tool.return_type);
        }

        println!();
        println!("  {}", "Resources:".style(self.ctx.styles.bold));
        if d.resources.is_empty() {
            println!("    {}", "(none)".style(self.ctx.styles.dim));
        }
        for r in &d.resources {
            let mode = if r.embedded { "embedded" } else { "external" };
            println!("    {:<20} {} ({mode})", r.name, r.kind.as_str());
        }

        if !d.prompts.is_empty() {
            println!();
            println!("  {}", "Prompts:".style(self.ctx.styles.bold));
            for p in &d.prompts {
                if p.variables.is_empty() {
                    println!("    {}", p.name);
                } else {
                    println!("    {:<20} {{{}}}", p.name, p.variables.join(", "));
                }
            }
        }
        println!();
    }

    /// Render the files of a written source tree.
    pub fn render_tree(&self, rendered: &RenderedSourceTree) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.success(&format!(
            "Rendered {} source ({} files)",
            rendered.tree.target,
            rendered.tree.files.len()
        ));
        self.ctx.kv("Directory:", &rendered.root.display().to_string());
        self.ctx.kv("Module:   ", &rendered.tree.module_name);
        for rel in rendered.tree.files.keys() {
            println!("    {rel}");
        }
    }

    /// Render toolchain probe results. `missing` lists the required tools
    /// that are unavailable for the probed target.
    pub fn render_toolchain(&self, statuses: &[ToolchainStatus], missing: &[String]) {
        println!();
        println!("  {}", "Agentify Toolchain Check".style(self.ctx.styles.header));
        println!();
        for status in statuses {
            let mut line = status.name.clone();
            if let Some(v) = &status.version {
                line.push_str(&format!(" {v}"));
            }
            if let Some(detail) = &status.detail {
                line.push_str(&format!(" ({detail})"));
            }
            self.print_check(status.available, &line);
        }
        println!();
        if missing.is_empty() {
            println!(
                "  {} Everything looks good!",
                "\u{2713}".style(self.ctx.styles.success)
            );
        } else {
            println!(
                "  {} Missing: {}. Builds will run in mock mode.",
                "\u{26a0}".style(self.ctx.styles.warning),
                missing.join(", ")
            );
            println!("      Install: agentify doctor --install");
        }
        println!();
    }

    /// Render the stored configuration and the environment it resolves to.
    pub fn render_config(&self, config: &AgentifyConfig, path: &Path, env: &ExecutionEnvironment) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for key in VALID_CONFIG_KEYS {
            let value = config.get(key).unwrap_or_else(|| "(not set)".to_string());
            println!("  {:<26} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Effective:".style(self.ctx.styles.bold));
        println!("    {:<24} {}", "output root:", env.output_root.display());
        println!("    {:<24} {}", "tool install:", on_off(env.allow_tool_install));
        println!("    {:<24} {}", "build concurrency:", env.build_concurrency);
        println!("    {:<24} {}s", "default build timeout:", env.default_build_timeout_secs);
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["AGENTIFY_CONFIG", "AGENTIFY_ENV", "NO_COLOR"] {
            println!(
                "    {:<24} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }

    fn print_check(&self, ok: bool, msg: &str) {
        if ok {
            println!("    {} {msg}", "\u{2713}".style(self.ctx.styles.success));
        } else {
            println!("    {} {msg}", "\u{2717}".style(self.ctx.styles.error));
        }
    }
}

// ── Display helpers ──────────────────────────────────────────────────────────

#[must_use]
pub fn status_display(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Pending => "pending",
        RecordStatus::Succeeded => "succeeded",
        RecordStatus::Degraded => "degraded (mock mode)",
        RecordStatus::Failed => "failed",
    }
}

#[must_use]
pub fn format_isolation(limits: &IsolationLimits) -> String {
    let mut parts = vec![
        limits.level.as_str().to_string(),
        format!("{} MB", limits.memory_mb),
        format!("{} cpu", limits.cpu_cores),
        format!("{}s", limits.time_limit_secs),
    ];
    if limits.network_access {
        parts.push("network".to_string());
    }
    if limits.filesystem_access {
        parts.push("filesystem".to_string());
    }
    parts.join(", ")
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}
