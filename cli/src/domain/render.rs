//! Source tree generation: pure functions, no I/O, no async.
//!
//! [`render_tree`] turns a descriptor into an in-memory [`SourceTree`]; the
//! caller is responsible for writing it to disk. Output is deterministic: the
//! only varying content is the optional `Generated at` comment in the digest
//! file.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.

#![allow(clippy::format_push_string)]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use agentify_common::{
    AgentPluginDescriptor, AgentType, BuildTarget, IsolationLimits, ParameterSpec, ResourceKind,
    ToolSpec,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::error::TemplateError;
use crate::domain::templates::{
    BYTECODE_INIT_PY, BYTECODE_RESOURCES_PY, BYTECODE_TOOL_PY, BYTECODE_TOOLS_INIT_PY,
    NATIVE_CARGO_TOML, NATIVE_LIB_RS, NATIVE_RESOURCES_RS, NATIVE_TOOL_RS, NATIVE_TOOLS_MOD_RS,
    TemplateSet,
};
use crate::domain::validate::{PARAM_REF_RE, undeclared_parameters};

pub const MANIFEST_FILE: &str = "agent.manifest.json";
pub const PROMPTS_FILE: &str = "prompts.json";
pub const DIGEST_FILE: &str = "agent.sha256";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Python package directory for bytecode builds.
pub const PY_PACKAGE: &str = "agent";

/// Rendered files keyed by `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub target: BuildTarget,
    /// Crate name (native) used to locate the built library.
    pub module_name: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Crate-safe module name derived from the last segment of `agent_name`.
///
/// `urn:agent:agentify:starbucks-helper` → `starbucks_helper`.
#[must_use]
pub fn module_name(agent_name: &str) -> String {
    let last = agent_name.rsplit(':').next().unwrap_or(agent_name);
    let mut out = String::new();
    for c in last.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_').to_string();
    if trimmed.is_empty() || trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("agent_{trimmed}").trim_end_matches('_').to_string()
    } else {
        trimmed
    }
}

/// Module identifier for a tool; prefixed so no tool name can collide with a
/// keyword in either target language.
#[must_use]
pub fn tool_module(tool_name: &str) -> String {
    format!("tool_{}", tool_name.replace('-', "_"))
}

/// Render the full source tree for `descriptor`.
///
/// # Errors
///
/// Returns a [`TemplateError`] when two tools map to the same module, two
/// resources share a name, a body references an undeclared parameter, or a
/// template fragment is missing.
pub fn render_tree(
    descriptor: &AgentPluginDescriptor,
    templates: &TemplateSet,
    generated_at: Option<DateTime<Utc>>,
) -> Result<SourceTree, TemplateError> {
    check_names(descriptor)?;

    let module_name = module_name(&descriptor.agent_name);
    let header = format!(
        "Generated by agentify from {} - DO NOT EDIT",
        one_line(&descriptor.agent_name)
    );

    let mut files = match descriptor.build_target {
        BuildTarget::NativeModule => native_files(descriptor, templates, &header, &module_name)?,
        BuildTarget::BytecodeModule => bytecode_files(descriptor, templates, &header)?,
    };

    files.insert(
        MANIFEST_FILE.to_string(),
        to_pretty_json("manifest", &Manifest::from_descriptor(descriptor, &module_name))?,
    );
    files.insert(
        PROMPTS_FILE.to_string(),
        to_pretty_json("prompts", &descriptor.prompts)?,
    );

    let digest = digest_file(&files, generated_at);
    files.insert(DIGEST_FILE.to_string(), digest.into_bytes());

    Ok(SourceTree {
        target: descriptor.build_target,
        module_name,
        files,
    })
}

// Re-checked here even though the normalizer enforces the same invariants:
// descriptors can also arrive already canonical from storage.
fn check_names(d: &AgentPluginDescriptor) -> Result<(), TemplateError> {
    let mut modules = HashSet::new();
    for tool in &d.tools {
        if !modules.insert(tool_module(&tool.name)) {
            return Err(TemplateError::DuplicateTool(tool.name.clone()));
        }
        if let Some(parameter) = undeclared_parameters(tool).into_iter().next() {
            return Err(TemplateError::UndeclaredParameter {
                tool: tool.name.clone(),
                parameter,
            });
        }
    }
    let mut resources = HashSet::new();
    for res in &d.resources {
        if !resources.insert(res.name.as_str()) {
            return Err(TemplateError::DuplicateResource(res.name.clone()));
        }
    }
    Ok(())
}

// ── native-module ─────────────────────────────────────────────────────────────

fn native_files(
    d: &AgentPluginDescriptor,
    templates: &TemplateSet,
    header: &str,
    crate_name: &str,
) -> Result<BTreeMap<String, Vec<u8>>, TemplateError> {
    let mut files = BTreeMap::new();

    files.insert(
        "Cargo.toml".to_string(),
        templates
            .fill(NATIVE_CARGO_TOML, &[("header", header), ("crate_name", crate_name)])?
            .into_bytes(),
    );

    let mut table = String::new();
    let mut modules = String::new();
    for tool in &d.tools {
        let module = tool_module(&tool.name);
        table.push_str(&format!("    ({}, tools::{module}::call),\n", rust_str(&tool.name)));
        modules.push_str(&format!("pub mod {module};\n"));
        files.insert(
            format!("src/tools/{module}.rs"),
            native_tool(tool, templates, header)?.into_bytes(),
        );
    }

    files.insert(
        "src/lib.rs".to_string(),
        templates
            .fill(
                NATIVE_LIB_RS,
                &[
                    ("header", header),
                    ("agent_id", &rust_str(&d.agent_id)),
                    ("agent_name", &rust_str(&d.agent_name)),
                    ("agent_type", &rust_str(d.agent_type.as_str())),
                    ("tool_table", &table),
                ],
            )?
            .into_bytes(),
    );
    files.insert(
        "src/tools/mod.rs".to_string(),
        templates
            .fill(NATIVE_TOOLS_MOD_RS, &[("header", header), ("modules", &modules)])?
            .into_bytes(),
    );

    let mut embedded = String::new();
    let mut external = String::new();
    for res in &d.resources {
        if res.embedded {
            embedded.push_str(&format!(
                "    Resource {{ name: {}, kind: {}, data: {}, base64: {} }},\n",
                rust_str(&res.name),
                rust_str(res.kind.as_str()),
                rust_str(&res.content),
                res.kind == ResourceKind::Binary,
            ));
        } else {
            external.push_str(&format!(
                "    ({}, {}),\n",
                rust_str(&res.name),
                rust_str(&external_path(&res.name))
            ));
        }
    }
    files.insert(
        "src/resources.rs".to_string(),
        templates
            .fill(
                NATIVE_RESOURCES_RS,
                &[("header", header), ("embedded", &embedded), ("external", &external)],
            )?
            .into_bytes(),
    );

    Ok(files)
}

fn native_tool(tool: &ToolSpec, templates: &TemplateSet, header: &str) -> Result<String, TemplateError> {
    let mut bindings = String::new();
    for p in &tool.parameters {
        let lit = rust_str(&p.name);
        if p.required {
            bindings.push_str(&format!(
                "    let p_{}: &str = arg(args, {lit}).ok_or_else(|| String::from({}))?;\n",
                p.name,
                rust_str(&format!("missing parameter: {}", p.name))
            ));
        } else {
            bindings.push_str(&format!(
                "    let p_{}: &str = arg(args, {lit}).unwrap_or({});\n",
                p.name,
                rust_str(&default_text(p))
            ));
        }
    }
    templates.fill(
        NATIVE_TOOL_RS,
        &[
            ("header", header),
            ("tool_name", &tool.name),
            ("description", &one_line(&tool.description)),
            ("tool_literal", &rust_str(&tool.name)),
            ("return_type", &rust_str(&tool.return_type)),
            ("bindings", &bindings),
            ("body", &indent(&bind_refs(&tool.implementation))),
        ],
    )
}

// ── bytecode-module ───────────────────────────────────────────────────────────

fn bytecode_files(
    d: &AgentPluginDescriptor,
    templates: &TemplateSet,
    header: &str,
) -> Result<BTreeMap<String, Vec<u8>>, TemplateError> {
    let mut files = BTreeMap::new();

    files.insert(
        format!("{PY_PACKAGE}/__init__.py"),
        templates
            .fill(
                BYTECODE_INIT_PY,
                &[
                    ("header", header),
                    ("agent_id", &py_str(&d.agent_id)?),
                    ("agent_name", &py_str(&d.agent_name)?),
                    ("agent_type", &py_str(d.agent_type.as_str())?),
                ],
            )?
            .into_bytes(),
    );

    let mut imports = String::new();
    for tool in &d.tools {
        let module = tool_module(&tool.name);
        imports.push_str(&format!("from . import {module}  # noqa: F401\n"));
        files.insert(
            format!("{PY_PACKAGE}/tools/{module}.py"),
            bytecode_tool(tool, templates, header)?.into_bytes(),
        );
    }
    files.insert(
        format!("{PY_PACKAGE}/tools/__init__.py"),
        templates
            .fill(BYTECODE_TOOLS_INIT_PY, &[("header", header), ("imports", &imports)])?
            .into_bytes(),
    );

    let mut embedded = String::new();
    let mut external = String::new();
    for res in &d.resources {
        if res.embedded {
            embedded.push_str(&format!(
                "    {}: ({}, {}, {}),\n",
                py_str(&res.name)?,
                py_str(res.kind.as_str())?,
                py_str(&res.content)?,
                py_bool(res.kind == ResourceKind::Binary),
            ));
        } else {
            external.push_str(&format!(
                "    {}: {},\n",
                py_str(&res.name)?,
                py_str(&external_path(&res.name))?
            ));
        }
    }
    files.insert(
        format!("{PY_PACKAGE}/resources.py"),
        templates
            .fill(
                BYTECODE_RESOURCES_PY,
                &[("header", header), ("embedded", &embedded), ("external", &external)],
            )?
            .into_bytes(),
    );

    let mut requirements = String::new();
    for dep in &d.dependencies {
        requirements.push_str(dep);
        requirements.push('\n');
    }
    files.insert(REQUIREMENTS_FILE.to_string(), requirements.into_bytes());

    Ok(files)
}

fn bytecode_tool(tool: &ToolSpec, templates: &TemplateSet, header: &str) -> Result<String, TemplateError> {
    let mut bindings = String::new();
    for p in &tool.parameters {
        let lit = py_str(&p.name)?;
        if p.required {
            bindings.push_str(&format!("    if {lit} not in args:\n"));
            bindings.push_str(&format!(
                "        raise ValueError({})\n",
                py_str(&format!("missing parameter: {}", p.name))?
            ));
            bindings.push_str(&format!("    p_{} = args[{lit}]\n", p.name));
        } else {
            bindings.push_str(&format!("    p_{} = args.get({lit}, {})\n", p.name, py_default(p)?));
        }
    }
    templates.fill(
        BYTECODE_TOOL_PY,
        &[
            ("header", header),
            ("tool_name", &tool.name),
            ("description", &one_line(&tool.description)),
            ("tool_literal", &py_str(&tool.name)?),
            ("return_type", &py_str(&tool.return_type)?),
            ("bindings", &bindings),
            ("body", &indent(&bind_refs(&tool.implementation))),
        ],
    )
}

// ── Manifest ──────────────────────────────────────────────────────────────────

/// Load-time manifest consumed by the runtime host.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    schema_version: u32,
    agent_id: &'a str,
    agent_name: &'a str,
    display_name: &'a str,
    agent_type: AgentType,
    build_target: BuildTarget,
    module: String,
    entrypoint: &'static str,
    isolation: &'a IsolationLimits,
    tools: Vec<ManifestTool<'a>>,
    resources: Vec<ManifestResource<'a>>,
    dependencies: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    facts_url: Option<&'a Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestTool<'a> {
    name: &'a str,
    return_type: &'a str,
    parameters: Vec<&'a str>,
}

#[derive(Serialize)]
struct ManifestResource<'a> {
    name: &'a str,
    kind: ResourceKind,
    embedded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl<'a> Manifest<'a> {
    fn from_descriptor(d: &'a AgentPluginDescriptor, module_name: &str) -> Self {
        let (module, entrypoint) = match d.build_target {
            BuildTarget::NativeModule => (module_name.to_string(), "dispatch"),
            BuildTarget::BytecodeModule => (PY_PACKAGE.to_string(), "agent.dispatch"),
        };
        Self {
            schema_version: 1,
            agent_id: &d.agent_id,
            agent_name: &d.agent_name,
            display_name: &d.display_name,
            agent_type: d.agent_type,
            build_target: d.build_target,
            module,
            entrypoint,
            isolation: &d.isolation,
            tools: d
                .tools
                .iter()
                .map(|t| ManifestTool {
                    name: &t.name,
                    return_type: &t.return_type,
                    parameters: t.parameters.iter().map(|p| p.name.as_str()).collect(),
                })
                .collect(),
            resources: d
                .resources
                .iter()
                .map(|r| ManifestResource {
                    name: &r.name,
                    kind: r.kind,
                    embedded: r.embedded,
                    path: (!r.embedded).then(|| external_path(&r.name)),
                })
                .collect(),
            dependencies: &d.dependencies,
            ttl: d.ttl.as_ref(),
            signature: d.signature.as_ref(),
            facts_url: d.facts_url.as_ref(),
        }
    }
}

fn digest_file(files: &BTreeMap<String, Vec<u8>>, generated_at: Option<DateTime<Utc>>) -> String {
    let mut out = String::from("# sha256 digests of generated sources\n");
    if let Some(at) = generated_at {
        out.push_str(&format!("# Generated at: {}\n", at.to_rfc3339()));
    }
    for (path, content) in files {
        let mut hasher = Sha256::new();
        hasher.update(content);
        out.push_str(&format!("{:x}  {path}\n", hasher.finalize()));
    }
    out
}

// ── Literal helpers ───────────────────────────────────────────────────────────

fn external_path(resource_name: &str) -> String {
    format!("resources/{resource_name}")
}

fn one_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

fn indent(body: &str) -> String {
    body.lines()
        .map(|l| if l.trim().is_empty() { String::new() } else { format!("    {l}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace `${name}` references with the bound local `p_name`.
fn bind_refs(body: &str) -> String {
    PARAM_REF_RE.replace_all(body, "p_$1").into_owned()
}

fn default_text(p: &ParameterSpec) -> String {
    match &p.default {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Rust string literal (`Debug` output is valid Rust syntax).
fn rust_str(s: &str) -> String {
    format!("{s:?}")
}

/// Python string literal (JSON string syntax is a subset of Python's).
fn py_str(s: &str) -> Result<String, TemplateError> {
    serde_json::to_string(s).map_err(|e| TemplateError::Serialize {
        what: "string literal".to_string(),
        message: e.to_string(),
    })
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn py_default(p: &ParameterSpec) -> Result<String, TemplateError> {
    Ok(match &p.default {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::Bool(b)) => py_bool(*b).to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => py_str(s)?,
        Some(other) => format!("json.loads({})", py_str(&other.to_string())?),
    })
}

fn to_pretty_json<T: Serialize>(what: &str, value: &T) -> Result<Vec<u8>, TemplateError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|e| TemplateError::Serialize {
        what: what.to_string(),
        message: e.to_string(),
    })?;
    text.push('\n');
    Ok(text.into_bytes())
}
