// lib/crates/agentify-common/src/descriptor.rs

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical agent plugin descriptor produced by the normalizer.
///
/// Every sequence is always present (possibly empty) and `isolation` is always
/// populated, so downstream stages never branch on missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPluginDescriptor {
    pub agent_id: String,
    pub agent_name: String,
    pub display_name: String,
    pub personality: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub agent_type: AgentType,
    #[serde(default)]
    pub build_target: BuildTarget,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub prompts: Vec<PromptSpec>,
    #[serde(default)]
    pub isolation: IsolationLimits,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts_url: Option<Value>,
}

impl AgentPluginDescriptor {
    /// Returns the tool with the given name, if declared.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Returns the resource with the given name, if declared.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Re-express this descriptor in the loosely-typed input shape.
    ///
    /// The canonical sequences are emitted explicitly and the UI-level
    /// `features`/`settings` objects are left empty, so normalizing the result
    /// reproduces this descriptor exactly.
    #[must_use]
    pub fn as_raw_input(&self) -> Value {
        let mut raw = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut raw {
            if let Some(display_name) = map.remove("displayName") {
                map.insert("name".to_string(), display_name);
            }
            map.insert("features".to_string(), Value::Object(serde_json::Map::new()));
            map.insert("settings".to_string(), Value::Object(serde_json::Map::new()));
        }
        raw
    }
}

/// Execution pattern of the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    #[default]
    Llm,
    Sequential,
    Parallel,
    Loop,
}

impl AgentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Loop => "loop",
        }
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llm" => Ok(Self::Llm),
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "loop" => Ok(Self::Loop),
            other => Err(format!(
                "unknown agent type '{other}' (expected llm, sequential, parallel or loop)"
            )),
        }
    }
}

/// Kind of module the compiler produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTarget {
    /// Shared library compiled from generated Rust sources.
    #[default]
    NativeModule,
    /// Python package compiled to bytecode.
    BytecodeModule,
}

impl BuildTarget {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NativeModule => "native-module",
            Self::BytecodeModule => "bytecode-module",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native-module" | "native" => Ok(Self::NativeModule),
            "bytecode-module" | "bytecode" => Ok(Self::BytecodeModule),
            other => Err(format!(
                "unknown build target '{other}' (expected native-module or bytecode-module)"
            )),
        }
    }
}

/// A callable tool exposed by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Source fragment in the build target's language. Parameters are
    /// referenced as `${name}`.
    pub implementation: String,
    #[serde(default = "default_return_type")]
    pub return_type: String,
}

fn default_return_type() -> String {
    "string".to_string()
}

/// A declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Value type of a tool parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

/// Data shipped with (or referenced by) the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub kind: ResourceKind,
    /// Text content; binary resources carry base64 here.
    pub content: String,
    #[serde(default = "default_embedded")]
    pub embedded: bool,
}

fn default_embedded() -> bool {
    true
}

impl ResourceSpec {
    #[must_use]
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Text,
            content: content.into(),
            embedded: true,
        }
    }

    /// Structured resource holding canonical (key-sorted) JSON text.
    #[must_use]
    pub fn structured(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Structured,
            content: value.to_string(),
            embedded: true,
        }
    }

    #[must_use]
    pub fn binary(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Binary,
            content: BASE64.encode(bytes),
            embedded: true,
        }
    }

    /// Raw bytes of the resource; binary content is base64-decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary resource does not hold valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.kind {
            ResourceKind::Binary => BASE64.decode(self.content.as_bytes()),
            ResourceKind::Text | ResourceKind::Structured => Ok(self.content.as_bytes().to_vec()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Text,
    Binary,
    Structured,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Structured => "structured",
        }
    }
}

/// A prompt template; `variables` lists its `{{var}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

/// Resource and access constraints applied around build and run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationLimits {
    pub level: IsolationLevel,
    pub memory_mb: u32,
    pub cpu_cores: f64,
    pub time_limit_secs: u64,
    pub network_access: bool,
    pub filesystem_access: bool,
}

impl Default for IsolationLimits {
    fn default() -> Self {
        Self {
            level: IsolationLevel::Process,
            memory_mb: 512,
            cpu_cores: 1.0,
            time_limit_secs: 60,
            network_access: true,
            filesystem_access: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    #[default]
    Process,
    Container,
    Vm,
}

impl IsolationLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Container => "container",
            Self::Vm => "vm",
        }
    }
}
