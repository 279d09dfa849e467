//! Command implementations

pub mod compile;
pub mod config;
pub mod doctor;
pub mod normalize;
pub mod render;
pub mod version;

use std::io::Read as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read an agent configuration from `path` (`-` reads stdin).
///
/// Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as
/// JSON. Both produce the same value shape.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed.
pub fn read_config_input(path: &Path) -> Result<Value> {
    let (content, label) = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read configuration from stdin")?;
        (buf, "stdin".to_string())
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        (content, path.display().to_string())
    };

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse YAML from {label}"))
    } else {
        serde_json::from_str(&content).with_context(|| format!("cannot parse JSON from {label}"))
    }
}
