//! Presentation-layer implementations of the `ProgressSink` port.
//!
//! Application services push [`ProgressEvent`]s without depending on any
//! presentation type; these sinks turn them into terminal lines, a spinner,
//! or JSON lines on stderr.

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressSink;
use crate::domain::record::{ProgressEvent, RecordStatus};
use crate::output::{OutputContext, Styles, progress};

/// Terminal progress reporter.
///
/// With a TTY it drives a single spinner; otherwise each event becomes one
/// `"  → [ 25%] inspecting: …"` line. Suppressed entirely when quiet.
pub struct TerminalReporter {
    styles: Styles,
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalReporter {
    /// Create a reporter matching the given output context.
    #[must_use]
    pub fn new(ctx: &OutputContext) -> Self {
        Self {
            styles: ctx.styles.clone(),
            quiet: ctx.quiet,
            spinner: ctx.show_progress().then(|| progress::spinner("starting")),
        }
    }

    fn mark(&self, status: RecordStatus) -> String {
        match status {
            RecordStatus::Pending => "→".style(self.styles.info).to_string(),
            RecordStatus::Succeeded => "✓".style(self.styles.success).to_string(),
            RecordStatus::Degraded => "⚠".style(self.styles.warning).to_string(),
            RecordStatus::Failed => "✗".style(self.styles.error).to_string(),
        }
    }
}

impl ProgressSink for TerminalReporter {
    fn emit(&self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }
        let line = format!("{}: {}", event.step, event.message);
        match &self.spinner {
            Some(pb) if event.status == RecordStatus::Pending => {
                pb.set_prefix(event.progress.to_string());
                pb.set_message(line);
            }
            Some(pb) => progress::finish_with(pb, &self.mark(event.status), &line),
            None => println!(
                "  {} [{:>3}%] {line}",
                self.mark(event.status),
                event.progress
            ),
        }
    }
}

/// Writes each event as one JSON object per line on stderr, leaving stdout
/// for the final result.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesReporter;

impl ProgressSink for JsonLinesReporter {
    fn emit(&self, event: &ProgressEvent) {
        match serde_json::to_string(event) {
            Ok(line) => eprintln!("{line}"),
            Err(e) => tracing::warn!(error = %e, "cannot serialize progress event"),
        }
    }
}

/// Either sink, chosen at runtime from the output mode.
pub enum Reporter {
    Terminal(TerminalReporter),
    JsonLines(JsonLinesReporter),
}

impl ProgressSink for Reporter {
    fn emit(&self, event: &ProgressEvent) {
        match self {
            Self::Terminal(r) => r.emit(event),
            Self::JsonLines(r) => r.emit(event),
        }
    }
}
