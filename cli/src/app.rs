//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once from the top-level flags. Commands read output
//! settings, the config store and the resolved execution environment from it
//! and ask it for a wired [`CompileService`].

use anyhow::Result;

use crate::application::services::compile::CompileService;
use crate::domain::config::ExecutionEnvironment;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{YamlConfigStore, resolve_environment};
use crate::infra::fs::StdFs;
use crate::infra::installer::PackageManagerInstaller;
use crate::output::{
    HumanRenderer, JsonLinesReporter, JsonRenderer, OutputContext, Renderer, Reporter,
    TerminalReporter,
};

/// Production wiring of the compile service.
pub type Compiler =
    CompileService<TokioCommandRunner, StdFs, PackageManagerInstaller<TokioCommandRunner>, Reporter>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `AGENTIFY_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Config file store.
    pub config_store: YamlConfigStore,
    /// Execution environment resolved from the config file and host.
    pub env: ExecutionEnvironment,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `AGENTIFY_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or the home
    /// directory is unknown.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("AGENTIFY_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore::from_env();
        let env = resolve_environment(&config_store, |name| std::env::var(name).ok())?;
        tracing::debug!(
            output_root = %env.output_root.display(),
            allow_tool_install = env.allow_tool_install,
            concurrency = env.build_concurrency,
            "resolved execution environment"
        );

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store,
            env,
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress sink for the current output mode.
    #[must_use]
    pub fn reporter(&self) -> Reporter {
        match self.mode {
            OutputMode::Human => Reporter::Terminal(TerminalReporter::new(&self.output)),
            OutputMode::Json => Reporter::JsonLines(JsonLinesReporter),
        }
    }

    /// Process runner used for toolchain probes and builds.
    #[must_use]
    pub fn runner(&self) -> TokioCommandRunner {
        TokioCommandRunner::new()
    }

    /// Installer backed by the host package manager.
    #[must_use]
    pub fn installer(&self) -> PackageManagerInstaller<TokioCommandRunner> {
        PackageManagerInstaller::new(self.runner())
    }

    /// Compile service wired to the real toolchain, filesystem and reporter.
    #[must_use]
    pub fn compiler(&self) -> Compiler {
        CompileService::new(
            self.runner(),
            StdFs,
            self.installer(),
            self.reporter(),
            self.env.clone(),
        )
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `AGENTIFY_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
