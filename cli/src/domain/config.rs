//! Domain types and validators for Agentify configuration.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "environment.production",
    "build.concurrency",
    "build.defaultTimeoutSecs",
    "output.root",
    "output.stampTimestamps",
];

/// Directory created under the temp dir for serverless hosts.
pub const TRANSIENT_DIR: &str = "agentify-builds";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.agentify/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentifyConfig {
    pub environment: EnvironmentConfig,
    pub build: BuildConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Production hosts never self-install tools.
    pub production: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Maximum number of external builds running at once.
    pub concurrency: usize,
    /// Build timeout for descriptors that declare no time limit, in seconds.
    pub default_timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            default_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub stamp_timestamps: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            stamp_timestamps: true,
        }
    }
}

impl AgentifyConfig {
    /// Current value of `key` as displayed by `config show`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "environment.production" => Some(self.environment.production.to_string()),
            "build.concurrency" => Some(self.build.concurrency.to_string()),
            "build.defaultTimeoutSecs" => Some(self.build.default_timeout_secs.to_string()),
            "output.root" => Some(
                self.output
                    .root
                    .as_ref()
                    .map_or_else(|| "(default)".to_string(), |p| p.display().to_string()),
            ),
            "output.stampTimestamps" => Some(self.output.stamp_timestamps.to_string()),
            _ => None,
        }
    }

    /// Validate and apply `key = value`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        validate_config_key(key)?;
        match key {
            "environment.production" => self.environment.production = parse_bool(key, value)?,
            "build.concurrency" => self.build.concurrency = parse_positive(key, value)?,
            "build.defaultTimeoutSecs" => self.build.default_timeout_secs = parse_positive(key, value)?,
            "output.root" => {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "a directory path"));
                }
                self.output.root = Some(PathBuf::from(value));
            }
            "output.stampTimestamps" => self.output.stamp_timestamps = parse_bool(key, value)?,
            _ => {}
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<(), ConfigError> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        });
    }
    Ok(())
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "true, false")),
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, value, "a positive integer")),
    }
}

// ── Execution environment ────────────────────────────────────────────────────

/// Host signals read by the infra layer, never inside business logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostIndicators {
    pub production: bool,
    pub serverless: bool,
}

/// Everything the orchestrator needs to know about where and how it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEnvironment {
    pub output_root: PathBuf,
    pub allow_tool_install: bool,
    pub build_concurrency: usize,
    pub default_build_timeout_secs: u64,
    pub stamp_timestamps: bool,
}

impl ExecutionEnvironment {
    /// Combine the config file with host indicators.
    ///
    /// Production (from either source) disables tool install. Serverless hosts
    /// write under `temp_dir` regardless of the configured root.
    #[must_use]
    pub fn resolve(
        config: &AgentifyConfig,
        host: HostIndicators,
        default_root: &Path,
        temp_dir: &Path,
    ) -> Self {
        let production = config.environment.production || host.production;
        let output_root = if host.serverless {
            temp_dir.join(TRANSIENT_DIR)
        } else {
            config
                .output
                .root
                .clone()
                .unwrap_or_else(|| default_root.to_path_buf())
        };
        Self {
            output_root,
            allow_tool_install: !production,
            build_concurrency: config.build.concurrency.max(1),
            default_build_timeout_secs: config.build.default_timeout_secs,
            stamp_timestamps: config.output.stamp_timestamps,
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
