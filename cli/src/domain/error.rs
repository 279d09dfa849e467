//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Validation errors ─────────────────────────────────────────────────────────

/// Bad or incomplete input configuration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("agent configuration is invalid:\n{}", .violations.join("\n"))]
pub struct ValidationError {
    /// Every rule the input broke, in check order.
    pub violations: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    #[must_use]
    pub fn single(violation: impl Into<String>) -> Self {
        Self {
            violations: vec![violation.into()],
        }
    }
}

// ── Toolchain errors ──────────────────────────────────────────────────────────

/// Detection-time failure. Routes the compile to degraded mode.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("required tools unavailable: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("toolchain still incomplete after install: {}", .0.join(", "))]
    StillMissing(Vec<String>),

    #[error("tool installation is disabled in this environment")]
    InstallDisabled,
}

/// Best-effort install failure; lists the tools that still failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to install: {}", .failures.iter().map(|(tool, why)| format!("{tool} ({why})")).collect::<Vec<_>>().join(", "))]
pub struct InstallError {
    /// `(tool name, reason)` per failed install.
    pub failures: Vec<(String, String)>,
}

impl InstallError {
    /// Names of the tools that failed to install.
    #[must_use]
    pub fn failed_tools(&self) -> Vec<&str> {
        self.failures.iter().map(|(tool, _)| tool.as_str()).collect()
    }
}

// ── Template errors ───────────────────────────────────────────────────────────

/// Generation-time defect in the descriptor or the template set.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("duplicate tool '{0}'")]
    DuplicateTool(String),

    #[error("duplicate resource '{0}'")]
    DuplicateResource(String),

    #[error("template fragment '{0}' is missing")]
    MissingFragment(String),

    #[error("template fragment '{fragment}' has no value for placeholder '{placeholder}'")]
    MissingValue {
        fragment: String,
        placeholder: String,
    },

    #[error("tool '{tool}' references undeclared parameter '{parameter}'")]
    UndeclaredParameter { tool: String, parameter: String },

    #[error("cannot prepare working directory {}: {message}", .path.display())]
    WorkingDir { path: PathBuf, message: String },

    #[error("cannot write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    #[error("refusing to replace {}: not empty and holds no {manifest}", .path.display())]
    ForeignDir { path: PathBuf, manifest: &'static str },

    #[error("cannot serialize {what}: {message}")]
    Serialize { what: String, message: String },
}

// ── Build errors ──────────────────────────────────────────────────────────────

/// External compiler failure. Never retried automatically.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Exit {
        code: Option<i32>,
        tail: Vec<String>,
    },

    #[error("build timed out after {secs}s")]
    Timeout { secs: u64, tail: Vec<String> },

    #[error("build cancelled")]
    Cancelled { tail: Vec<String> },

    #[error("cannot start build: {0}")]
    Spawn(String),

    #[error("build succeeded but produced no artifact at {}", .0.display())]
    MissingArtifact(PathBuf),
}

impl BuildError {
    /// Last captured log lines, when the build got far enough to produce any.
    #[must_use]
    pub fn tail(&self) -> &[String] {
        match self {
            Self::Exit { tail, .. } | Self::Timeout { tail, .. } | Self::Cancelled { tail } => tail,
            Self::Spawn(_) | Self::MissingArtifact(_) => &[],
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
