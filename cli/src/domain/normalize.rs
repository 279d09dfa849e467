//! Config normalizer: loosely-typed UI configuration in, canonical
//! `AgentPluginDescriptor` out.
//!
//! Pure over its input plus an injected [`IdSource`]; no I/O, no async.

use std::collections::BTreeSet;

use agentify_common::{
    AgentPluginDescriptor, AgentType, BuildTarget, IsolationLimits, PromptSpec, ResourceKind,
    ResourceSpec, ToolSpec,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::catalog::ToolCatalog;
use crate::domain::error::ValidationError;
use crate::domain::validate::{prompt_variables, validate_descriptor};

/// Prefix of generated agent names.
pub const AGENT_NAME_PREFIX: &str = "urn:agent:agentify:";

/// Source of fresh agent identifiers. Uniqueness matters, unpredictability
/// does not.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Production [`IdSource`] backed by UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Build an agent name from a display name:
/// `"Starbucks Helper"` → `"urn:agent:agentify:starbucks-helper"`.
#[must_use]
pub fn agent_name_from_display(display_name: &str) -> String {
    let slug = display_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("{AGENT_NAME_PREFIX}{slug}")
}

/// Normalize a raw configuration object into a canonical descriptor.
///
/// Required keys: `name`, `personality`, `features` (object), `settings`
/// (object). Explicit `tools`/`resources`/`prompts` arrays are taken verbatim;
/// catalog tools and settings-derived resources are appended after them.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every problem found.
pub fn normalize(
    raw: &Value,
    catalog: &ToolCatalog,
    ids: &dyn IdSource,
) -> Result<AgentPluginDescriptor, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::single("configuration must be a JSON object"));
    };

    let mut errors: Vec<String> = Vec::new();

    let display_name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if display_name.is_none() {
        errors.push("name (display name) is required".to_string());
    }
    let personality = obj.get("personality").and_then(Value::as_str);
    if personality.is_none() {
        errors.push("personality is required".to_string());
    }
    let features = obj.get("features").and_then(Value::as_object);
    if features.is_none() {
        errors.push("features is required and must be an object".to_string());
    }
    let settings = obj.get("settings").and_then(Value::as_object);
    if settings.is_none() {
        errors.push("settings is required and must be an object".to_string());
    }

    let (Some(display_name), Some(personality), Some(features), Some(settings)) =
        (display_name, personality, features, settings)
    else {
        return Err(ValidationError::new(errors));
    };

    let instructions = obj
        .get("instructions")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let agent_type = parse_enum::<AgentType>(obj, "agentType", &mut errors).unwrap_or_default();
    let build_target = parse_enum::<BuildTarget>(obj, "buildTarget", &mut errors).unwrap_or_default();

    let agent_id = non_empty_str(obj, "agentId").map_or_else(|| ids.next_id(), str::to_string);
    let agent_name = non_empty_str(obj, "agentName")
        .map_or_else(|| agent_name_from_display(display_name), str::to_string);

    let mut tools: Vec<ToolSpec> = explicit(obj, "tools", &mut errors);
    tools.extend(catalog.expand(features, build_target));

    let mut resources: Vec<ResourceSpec> = explicit(obj, "resources", &mut errors);
    resources.extend(settings_resources(settings, &mut errors));

    let prompts = if obj.contains_key("prompts") {
        explicit::<PromptSpec>(obj, "prompts", &mut errors)
            .into_iter()
            .map(|p| prompt(p.name, p.content))
            .collect()
    } else {
        derived_prompts(personality, &instructions)
    };

    let isolation = isolation(obj, &mut errors);
    let dependencies = dependencies(obj, &mut errors);

    if !errors.is_empty() {
        return Err(ValidationError::new(errors));
    }

    let descriptor = AgentPluginDescriptor {
        agent_id,
        agent_name,
        display_name: display_name.to_string(),
        personality: personality.to_string(),
        instructions,
        agent_type,
        build_target,
        tools,
        resources,
        prompts,
        isolation,
        dependencies,
        ttl: carried(obj, "ttl"),
        signature: carried(obj, "signature"),
        facts_url: carried(obj, "factsUrl"),
    };

    validate_descriptor(&descriptor)?;
    Ok(descriptor)
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn carried(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| !v.is_null()).cloned()
}

fn parse_enum<T>(obj: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value = obj.get(key).filter(|v| !v.is_null())?;
    match value.as_str().map(str::parse::<T>) {
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(e)) => {
            errors.push(format!("{key}: {e}"));
            None
        }
        None => {
            errors.push(format!("{key} must be a string"));
            None
        }
    }
}

fn explicit<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Vec<T> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            errors.push(format!("{key}: {e}"));
            Vec::new()
        }),
    }
}

fn isolation(obj: &Map<String, Value>, errors: &mut Vec<String>) -> IsolationLimits {
    let Some(given) = obj.get("isolation").filter(|v| !v.is_null()) else {
        return IsolationLimits::default();
    };
    let Some(given) = given.as_object() else {
        errors.push("isolation must be an object".to_string());
        return IsolationLimits::default();
    };

    // Overlay the supplied keys on the defaults so partial objects are completed.
    let mut merged = match serde_json::to_value(IsolationLimits::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (k, v) in given {
        merged.insert(k.clone(), v.clone());
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or_else(|e| {
        errors.push(format!("isolation: {e}"));
        IsolationLimits::default()
    })
}

fn dependencies(obj: &Map<String, Value>, errors: &mut Vec<String>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    match obj.get("dependencies") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                match item.as_str().map(str::trim) {
                    Some("") => {}
                    Some(dep) => {
                        out.insert(dep.to_string());
                    }
                    None => errors.push("dependencies must contain only strings".to_string()),
                }
            }
        }
        Some(_) => errors.push("dependencies must be an array of package names".to_string()),
    }
    out
}

// ── Prompts ───────────────────────────────────────────────────────────────────

fn prompt(name: String, content: String) -> PromptSpec {
    let variables = prompt_variables(&content);
    PromptSpec {
        name,
        content,
        variables,
    }
}

fn derived_prompts(personality: &str, instructions: &str) -> Vec<PromptSpec> {
    let mut prompts = Vec::new();
    if !personality.trim().is_empty() {
        prompts.push(prompt("personality".to_string(), personality.to_string()));
    }
    if !instructions.trim().is_empty() {
        prompts.push(prompt("instructions".to_string(), instructions.to_string()));
    }
    prompts
}

// ── Settings → resources ──────────────────────────────────────────────────────

fn resource_slug(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    mapped.trim_matches(|c| matches!(c, '-' | '.' | '_')).to_string()
}

fn settings_resources(settings: &Map<String, Value>, errors: &mut Vec<String>) -> Vec<ResourceSpec> {
    let mut resources = Vec::new();

    match settings.get("mcpServers") {
        None | Some(Value::Null) => {}
        Some(Value::Array(servers)) => {
            for (i, server) in servers.iter().enumerate() {
                let Some(fields) = server.as_object() else {
                    errors.push(format!("settings.mcpServers[{i}] must be an object"));
                    continue;
                };
                if fields.get("enabled") == Some(&Value::Bool(false)) {
                    continue;
                }
                let slug = fields
                    .get("name")
                    .and_then(Value::as_str)
                    .map(resource_slug)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| i.to_string());
                resources.push(ResourceSpec::structured(format!("mcp-server-{slug}"), server));
            }
        }
        Some(_) => errors.push("settings.mcpServers must be an array".to_string()),
    }

    match settings.get("temperature") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => resources.push(ResourceSpec::text("temperature", n.to_string())),
        Some(_) => errors.push("settings.temperature must be a number".to_string()),
    }

    let mut credentials: Vec<(String, String)> = Vec::new();
    match settings.get("credentials") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (key, value) in entries {
                if let Some(secret) = value.as_str().filter(|s| !s.is_empty()) {
                    credentials.push((resource_slug(key), secret.to_string()));
                }
            }
        }
        Some(_) => errors.push("settings.credentials must be an object".to_string()),
    }
    if let Some(key) = settings
        .get("apiKey")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        credentials.push(("api-key".to_string(), key.to_string()));
    }
    for (name, secret) in credentials {
        // Credentials are referenced by path at run time, never baked into artifacts.
        resources.push(ResourceSpec {
            name: format!("credential-{name}"),
            kind: ResourceKind::Text,
            content: secret,
            embedded: false,
        });
    }

    resources
}
