//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod catalog;
pub mod config;
pub mod error;
pub mod normalize;
pub mod record;
pub mod render;
pub mod templates;
pub mod toolchain;
pub mod validate;

pub use catalog::{ToolCatalog, ToolTemplate};
pub use config::{AgentifyConfig, ExecutionEnvironment, HostIndicators, validate_config_key};
pub use error::{
    BuildError, ConfigError, InstallError, TemplateError, ToolchainError, ValidationError,
};
pub use normalize::{IdSource, RandomIds, normalize};
pub use record::{
    CompilationRecord, CompileOutcome, CompileState, FailureReason, MOCK_MARKER, ProgressEvent,
    RecordStatus,
};
pub use render::{SourceTree, render_tree};
pub use templates::TemplateSet;
pub use toolchain::{ToolchainCatalog, ToolchainStatus};
