//! Compilation state machine and per-request trace.
//!
//! A [`CompilationRecord`] is owned by one compile request. It only moves along
//! the transitions [`CompileState::can_advance_to`] allows and is sealed once
//! it reaches a terminal state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Log marker identifying a placeholder (non-functional) artifact.
pub const MOCK_MARKER: &str = "[mock-mode]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileState {
    Created,
    Normalizing,
    Inspecting,
    Ready,
    ToolchainMissing,
    Installing,
    Rendering,
    Building,
    Succeeded,
    Failed,
    Degraded,
}

impl CompileState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Normalizing => "normalizing",
            Self::Inspecting => "inspecting",
            Self::Ready => "ready",
            Self::ToolchainMissing => "toolchain-missing",
            Self::Installing => "installing",
            Self::Rendering => "rendering",
            Self::Building => "building",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Degraded => "degraded",
        }
    }

    /// Overall progress percentage reported when this state is entered.
    #[must_use]
    pub fn progress(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Normalizing => 10,
            Self::Inspecting => 25,
            Self::ToolchainMissing => 30,
            Self::Installing => 35,
            Self::Ready => 40,
            Self::Rendering => 55,
            Self::Building => 75,
            Self::Succeeded | Self::Failed | Self::Degraded => 100,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Degraded)
    }

    #[must_use]
    pub fn status(self) -> RecordStatus {
        match self {
            Self::Succeeded => RecordStatus::Succeeded,
            Self::Failed => RecordStatus::Failed,
            Self::Degraded => RecordStatus::Degraded,
            _ => RecordStatus::Pending,
        }
    }

    /// Whether `next` is a legal successor. Any non-terminal state may fail.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Self::Created, Self::Normalizing)
                | (Self::Normalizing, Self::Inspecting)
                | (Self::Inspecting, Self::Ready | Self::ToolchainMissing)
                | (Self::ToolchainMissing, Self::Installing | Self::Degraded)
                | (Self::Installing, Self::Inspecting | Self::Degraded)
                | (Self::Ready, Self::Rendering)
                | (Self::Rendering, Self::Building)
                | (Self::Building, Self::Succeeded)
        )
    }
}

impl std::fmt::Display for CompileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Succeeded,
    Failed,
    Degraded,
}

impl RecordStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Degraded => "degraded",
        }
    }
}

/// Why a compile ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum FailureReason {
    Validation(String),
    Template(String),
    Build(String),
    Io(String),
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(m) => write!(f, "validation failed: {m}"),
            Self::Template(m) => write!(f, "rendering failed: {m}"),
            Self::Build(m) => write!(f, "build failed: {m}"),
            Self::Io(m) => write!(f, "I/O error: {m}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Per-request compilation trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationRecord {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub state: CompileState,
    pub status: RecordStatus,
    pub log: Vec<LogEntry>,
    pub transitions: Vec<CompileState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    #[serde(skip)]
    install_attempted: bool,
}

impl CompilationRecord {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            agent_id: None,
            state: CompileState::Created,
            status: RecordStatus::Pending,
            log: Vec::new(),
            transitions: vec![CompileState::Created],
            failure: None,
            artifact_path: None,
            install_attempted: false,
        }
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Append a log line. Ignored once sealed.
    pub fn log(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.is_sealed() {
            tracing::debug!(request_id = %self.request_id, %message, "log append after seal ignored");
            return false;
        }
        self.log.push(LogEntry {
            at: Utc::now(),
            message,
        });
        true
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub fn advance(&mut self, next: CompileState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::debug!(
                request_id = %self.request_id,
                from = %self.state,
                to = %next,
                "illegal transition ignored"
            );
            return false;
        }
        self.state = next;
        self.status = next.status();
        self.transitions.push(next);
        true
    }

    /// Claim the single install attempt this record is allowed.
    pub fn begin_install(&mut self) -> bool {
        if self.install_attempted {
            return false;
        }
        self.install_attempted = true;
        true
    }

    #[must_use]
    pub fn install_attempted(&self) -> bool {
        self.install_attempted
    }

    pub fn succeed(&mut self, artifact: PathBuf) -> bool {
        let path = artifact.display().to_string();
        if self.log(format!("build succeeded: {path}")) && self.advance(CompileState::Succeeded) {
            self.artifact_path = Some(artifact);
            return true;
        }
        false
    }

    /// Seal as degraded, recording the placeholder path and the mock marker.
    pub fn degrade(&mut self, placeholder: PathBuf, why: &str) -> bool {
        let line = format!(
            "{MOCK_MARKER} no real build performed ({why}); placeholder artifact at {}",
            placeholder.display()
        );
        if self.log(line) && self.advance(CompileState::Degraded) {
            self.artifact_path = Some(placeholder);
            return true;
        }
        false
    }

    pub fn fail(&mut self, reason: FailureReason) -> bool {
        if self.log(reason.to_string()) && self.advance(CompileState::Failed) {
            self.failure = Some(reason);
            return true;
        }
        false
    }

    /// Log lines containing the mock marker.
    pub fn mock_lines(&self) -> impl Iterator<Item = &str> {
        self.log
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| m.contains(MOCK_MARKER))
    }
}

/// Pushed to the progress sink after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub request_id: String,
    pub step: CompileState,
    pub progress: u8,
    pub message: String,
    pub status: RecordStatus,
}

impl ProgressEvent {
    #[must_use]
    pub fn from_record(record: &CompilationRecord, message: impl Into<String>) -> Self {
        Self {
            request_id: record.request_id.clone(),
            step: record.state,
            progress: record.state.progress(),
            message: message.into(),
            status: record.status,
        }
    }
}

/// Final result of one compile request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutcome {
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub record: CompilationRecord,
}

impl From<CompilationRecord> for CompileOutcome {
    fn from(record: CompilationRecord) -> Self {
        Self {
            status: record.status,
            artifact_path: record.artifact_path.clone(),
            error: record.failure.as_ref().map(ToString::to_string),
            record,
        }
    }
}
