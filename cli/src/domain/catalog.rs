//! Built-in tool catalog: maps UI feature flags to tool templates.
//!
//! The catalog is an ordinary value handed to the normalizer, so callers can
//! swap or extend it without global registration. Expansion walks the catalog
//! in declaration order, which makes the resulting tool order independent of
//! the key order of the input object.

use agentify_common::{BuildTarget, ParamType, ParameterSpec, ToolSpec};
use serde_json::Value;

/// A tool contributed by one feature flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolTemplate {
    /// Feature flag that enables this tool (e.g. `"automation"`).
    pub feature: String,
    /// Name of the generated tool (e.g. `"automate"`).
    pub tool: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    /// Implementation body for `native-module` builds (Rust).
    pub native_body: String,
    /// Implementation body for `bytecode-module` builds (Python).
    pub bytecode_body: String,
    pub return_type: String,
}

impl ToolTemplate {
    /// Instantiate the template as a concrete tool for `target`.
    #[must_use]
    pub fn instantiate(&self, target: BuildTarget) -> ToolSpec {
        let implementation = match target {
            BuildTarget::NativeModule => self.native_body.clone(),
            BuildTarget::BytecodeModule => self.bytecode_body.clone(),
        };
        ToolSpec {
            name: self.tool.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            implementation,
            return_type: self.return_type.clone(),
        }
    }
}

/// Ordered feature → tool mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolCatalog {
    entries: Vec<ToolTemplate>,
}

impl ToolCatalog {
    /// An empty catalog: no feature contributes a tool.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog: `chat`, `automation`, `analytics`.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            entries: vec![chat_template(), automation_template(), analytics_template()],
        }
    }

    /// Append a template. A later entry for an already-known feature replaces
    /// the earlier one in place, keeping its position.
    #[must_use]
    pub fn with(mut self, template: ToolTemplate) -> Self {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|t| t.feature == template.feature)
        {
            *existing = template;
        } else {
            self.entries.push(template);
        }
        self
    }

    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&ToolTemplate> {
        self.entries.iter().find(|t| t.feature == feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolTemplate> {
        self.entries.iter()
    }

    /// Expand enabled feature flags into tools, in catalog order.
    ///
    /// A flag is enabled only when its value is JSON `true`; unknown flags and
    /// any other value contribute nothing.
    #[must_use]
    pub fn expand(&self, features: &serde_json::Map<String, Value>, target: BuildTarget) -> Vec<ToolSpec> {
        let mut tools = Vec::new();
        for template in &self.entries {
            if features.get(&template.feature) == Some(&Value::Bool(true)) {
                tools.push(template.instantiate(target));
            }
        }
        tools
    }
}

fn param(name: &str, required: bool, default: Option<&str>) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        param_type: ParamType::String,
        required,
        default: default.map(|d| Value::String(d.to_string())),
    }
}

fn chat_template() -> ToolTemplate {
    ToolTemplate {
        feature: "chat".to_string(),
        tool: "chat".to_string(),
        description: "Reply to a user message in the agent's voice".to_string(),
        parameters: vec![param("message", true, None)],
        native_body: "Ok(format!(\"[{}] {}\", crate::AGENT_NAME, ${message}))".to_string(),
        bytecode_body: "return \"[%s] %s\" % (AGENT_NAME, ${message})".to_string(),
        return_type: "string".to_string(),
    }
}

fn automation_template() -> ToolTemplate {
    ToolTemplate {
        feature: "automation".to_string(),
        tool: "automate".to_string(),
        description: "Queue a task for automated execution".to_string(),
        parameters: vec![param("task", true, None), param("schedule", false, Some("now"))],
        native_body: "Ok(format!(\"scheduled '{}' ({})\", ${task}, ${schedule}))".to_string(),
        bytecode_body: "return \"scheduled '%s' (%s)\" % (${task}, ${schedule})".to_string(),
        return_type: "string".to_string(),
    }
}

fn analytics_template() -> ToolTemplate {
    ToolTemplate {
        feature: "analytics".to_string(),
        tool: "analyze".to_string(),
        description: "Summarise a metric over a time window".to_string(),
        parameters: vec![param("metric", true, None), param("window", false, Some("24h"))],
        native_body: "Ok(format!(\"{} over {}: no data\", ${metric}, ${window}))".to_string(),
        bytecode_body: "return \"%s over %s: no data\" % (${metric}, ${window})".to_string(),
        return_type: "string".to_string(),
    }
}
