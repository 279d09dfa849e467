//! Pure descriptor validation: no I/O, no async.
//!
//! All functions in this module are synchronous and take data in, returning
//! data out. Zero imports from `tokio`, `std::fs`, `crate::infra`,
//! `crate::commands`, or `crate::application`.

use std::collections::HashSet;
use std::sync::LazyLock;

use agentify_common::{AgentPluginDescriptor, ToolSpec};
use regex::Regex;

use crate::domain::error::ValidationError;

/// Tool names double as file and module names in the generated tree.
pub static TOOL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").expect("valid regex")
});

/// Parameter names become local identifiers (`p_<name>`).
pub static PARAM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_]{0,63}$").expect("valid regex")
});

pub static RESOURCE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9._-]{0,127}$").expect("valid regex")
});

/// Agent IDs are interpolated into working-directory names (CWE-22).
pub static AGENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,127}$").expect("valid regex")
});

/// `${name}` parameter reference inside an implementation body.
pub static PARAM_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid regex")
});

/// `{{ var }}` placeholder inside a prompt.
pub static PROMPT_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
});

/// Parameter names referenced by a tool body, in first-use order.
#[must_use]
pub fn parameter_refs(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PARAM_REF_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Prompt variables referenced by `content`, in first-use order.
#[must_use]
pub fn prompt_variables(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PROMPT_VAR_RE
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Parameters a tool body uses without declaring them.
#[must_use]
pub fn undeclared_parameters(tool: &ToolSpec) -> Vec<String> {
    parameter_refs(&tool.implementation)
        .into_iter()
        .filter(|r| !tool.parameters.iter().any(|p| &p.name == r))
        .collect()
}

/// Validate a fully-assembled descriptor. Returns every violation at once.
///
/// Checks:
/// 1. `agentId` non-empty and path-safe
/// 2. `agentName` non-empty
/// 3. tool names well-formed and unique
/// 4. parameter names well-formed and unique per tool
/// 5. every `${param}` in a body is declared
/// 6. resource names well-formed and unique
/// 7. isolation limits strictly positive
///
/// # Errors
///
/// Returns a [`ValidationError`] listing all violations if any check fails.
pub fn validate_descriptor(d: &AgentPluginDescriptor) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if d.agent_id.trim().is_empty() {
        errors.push("agentId must not be empty".to_string());
    } else if !AGENT_ID_RE.is_match(&d.agent_id) {
        errors.push(format!(
            "agentId '{}' may only contain letters, digits, '-' and '_'",
            d.agent_id
        ));
    }

    if d.agent_name.trim().is_empty() {
        errors.push("agentName must not be empty".to_string());
    }

    let mut tool_names = HashSet::new();
    for tool in &d.tools {
        if !TOOL_NAME_RE.is_match(&tool.name) {
            errors.push(format!(
                "tool name '{}' must be lowercase alphanumeric with '-' or '_'",
                tool.name
            ));
        }
        if !tool_names.insert(tool.name.as_str()) {
            errors.push(format!("duplicate tool name '{}'", tool.name));
        }

        let mut param_names = HashSet::new();
        for p in &tool.parameters {
            if !PARAM_NAME_RE.is_match(&p.name) {
                errors.push(format!(
                    "tool '{}': parameter name '{}' must be a lowercase identifier",
                    tool.name, p.name
                ));
            }
            if !param_names.insert(p.name.as_str()) {
                errors.push(format!(
                    "tool '{}': duplicate parameter '{}'",
                    tool.name, p.name
                ));
            }
        }

        for missing in undeclared_parameters(tool) {
            errors.push(format!(
                "tool '{}': implementation references undeclared parameter '{missing}'",
                tool.name
            ));
        }
    }

    let mut resource_names = HashSet::new();
    for res in &d.resources {
        if !RESOURCE_NAME_RE.is_match(&res.name) {
            errors.push(format!(
                "resource name '{}' must be lowercase alphanumeric with '.', '-' or '_'",
                res.name
            ));
        }
        if !resource_names.insert(res.name.as_str()) {
            errors.push(format!("duplicate resource name '{}'", res.name));
        }
    }

    let iso = &d.isolation;
    if iso.memory_mb == 0 {
        errors.push("isolation.memoryMb must be greater than 0".to_string());
    }
    if !(iso.cpu_cores.is_finite() && iso.cpu_cores > 0.0) {
        errors.push("isolation.cpuCores must be greater than 0".to_string());
    }
    if iso.time_limit_secs == 0 {
        errors.push("isolation.timeLimitSecs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(errors))
    }
}
