//! Named source fragments with `{{key}}` placeholders.
//!
//! Fragments are looked up by name at render time; a missing fragment or a
//! placeholder without a value is a [`TemplateError`], never a silent blank.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::TemplateError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{([a-z_]+)\}\}").expect("valid regex")
});

pub const NATIVE_CARGO_TOML: &str = "native/cargo_toml";
pub const NATIVE_LIB_RS: &str = "native/lib_rs";
pub const NATIVE_TOOLS_MOD_RS: &str = "native/tools_mod_rs";
pub const NATIVE_TOOL_RS: &str = "native/tool_rs";
pub const NATIVE_RESOURCES_RS: &str = "native/resources_rs";
pub const BYTECODE_INIT_PY: &str = "bytecode/init_py";
pub const BYTECODE_TOOLS_INIT_PY: &str = "bytecode/tools_init_py";
pub const BYTECODE_TOOL_PY: &str = "bytecode/tool_py";
pub const BYTECODE_RESOURCES_PY: &str = "bytecode/resources_py";

/// Fragment name → fragment text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateSet {
    fragments: BTreeMap<String, String>,
}

impl TemplateSet {
    /// The fragments shipped with the compiler for both build targets.
    #[must_use]
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert(NATIVE_CARGO_TOML, CARGO_TOML);
        set.insert(NATIVE_LIB_RS, LIB_RS);
        set.insert(NATIVE_TOOLS_MOD_RS, TOOLS_MOD_RS);
        set.insert(NATIVE_TOOL_RS, TOOL_RS);
        set.insert(NATIVE_RESOURCES_RS, RESOURCES_RS);
        set.insert(BYTECODE_INIT_PY, INIT_PY);
        set.insert(BYTECODE_TOOLS_INIT_PY, TOOLS_INIT_PY);
        set.insert(BYTECODE_TOOL_PY, TOOL_PY);
        set.insert(BYTECODE_RESOURCES_PY, RESOURCES_PY);
        set
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.fragments.insert(name.to_string(), text.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fragments.remove(name)
    }

    /// Fill fragment `name` with `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingFragment`] when the fragment does not
    /// exist and [`TemplateError::MissingValue`] when a placeholder has no value.
    pub fn fill(&self, name: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let text = self
            .fragments
            .get(name)
            .ok_or_else(|| TemplateError::MissingFragment(name.to_string()))?;

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in PLACEHOLDER_RE.captures_iter(text) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = values
                .iter()
                .find(|(k, _)| *k == key.as_str())
                .map(|(_, v)| *v)
                .ok_or_else(|| TemplateError::MissingValue {
                    fragment: name.to_string(),
                    placeholder: key.as_str().to_string(),
                })?;
            out.push_str(&text[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

// ── native-module fragments ───────────────────────────────────────────────────

const CARGO_TOML: &str = r#"# {{header}}
[package]
name = "{{crate_name}}"
version = "0.1.0"
edition = "2021"
publish = false

[lib]
crate-type = ["cdylib", "rlib"]
path = "src/lib.rs"

[dependencies]

[workspace]
"#;

const LIB_RS: &str = r#"// {{header}}
#![allow(dead_code, unused_variables)]

pub mod resources;
pub mod tools;

pub const AGENT_ID: &str = {{agent_id}};
pub const AGENT_NAME: &str = {{agent_name}};
pub const AGENT_TYPE: &str = {{agent_type}};

pub type ToolFn = fn(&[(&str, &str)]) -> Result<String, String>;

pub static TOOLS: &[(&str, ToolFn)] = &[
{{tool_table}}];

pub fn arg<'a>(args: &[(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    args.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

pub fn dispatch(name: &str, args: &[(&str, &str)]) -> Result<String, String> {
    match TOOLS.iter().find(|(tool, _)| *tool == name) {
        Some((_, f)) => f(args),
        None => Err(format!("unknown tool: {name}")),
    }
}

#[no_mangle]
pub extern "C" fn agentify_tool_count() -> usize {
    TOOLS.len()
}
"#;

const TOOLS_MOD_RS: &str = "// {{header}}
{{modules}}";

const TOOL_RS: &str = r#"// {{header}}
// {{tool_name}}: {{description}}
use crate::arg;

pub const NAME: &str = {{tool_literal}};
pub const RETURN_TYPE: &str = {{return_type}};

pub fn call(args: &[(&str, &str)]) -> Result<String, String> {
{{bindings}}{{body}}
}
"#;

const RESOURCES_RS: &str = r#"// {{header}}

pub struct Resource {
    pub name: &'static str,
    pub kind: &'static str,
    pub data: &'static str,
    pub base64: bool,
}

pub static EMBEDDED: &[Resource] = &[
{{embedded}}];

pub static EXTERNAL: &[(&str, &str)] = &[
{{external}}];

pub fn get(name: &str) -> Option<&'static Resource> {
    EMBEDDED.iter().find(|r| r.name == name)
}
"#;

// ── bytecode-module fragments ─────────────────────────────────────────────────

const INIT_PY: &str = r#"# {{header}}
AGENT_ID = {{agent_id}}
AGENT_NAME = {{agent_name}}
AGENT_TYPE = {{agent_type}}

TOOLS = {}


def register(name):
    def wrap(fn):
        TOOLS[name] = fn
        return fn
    return wrap


def dispatch(name, args):
    fn = TOOLS.get(name)
    if fn is None:
        raise KeyError("unknown tool: " + name)
    return fn(args)


from . import resources  # noqa: E402,F401
from . import tools  # noqa: E402,F401
"#;

const TOOLS_INIT_PY: &str = "# {{header}}
{{imports}}";

const TOOL_PY: &str = r#"# {{header}}
# {{tool_name}}: {{description}}
import json  # noqa: F401

from .. import AGENT_NAME, register  # noqa: F401

NAME = {{tool_literal}}
RETURN_TYPE = {{return_type}}


@register({{tool_literal}})
def call(args):
{{bindings}}{{body}}
"#;

const RESOURCES_PY: &str = r#"# {{header}}
import base64

EMBEDDED = {
{{embedded}}}

EXTERNAL = {
{{external}}}


def get(name):
    entry = EMBEDDED.get(name)
    if entry is None:
        return None
    kind, data, encoded = entry
    return base64.b64decode(data) if encoded else data
"#;
