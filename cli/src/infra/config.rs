//! Infrastructure implementation of the `ConfigStore` port, plus the host
//! environment probe that feeds `ExecutionEnvironment`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{AgentifyConfig, ExecutionEnvironment, HostIndicators};
use crate::infra::fs::agentify_dir;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_VAR: &str = "AGENTIFY_CONFIG";
/// `AGENTIFY_ENV=production` forces production mode.
pub const ENV_VAR: &str = "AGENTIFY_ENV";
/// Variables whose presence marks a serverless host.
pub const SERVERLESS_VARS: &[&str] = &["AGENTIFY_SERVERLESS", "AWS_LAMBDA_FUNCTION_NAME", "VERCEL"];

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
#[derive(Debug, Default, Clone)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Store at `$AGENTIFY_CONFIG`, else `~/.agentify/config.yaml`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from),
        }
    }

    /// Store at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<AgentifyConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(AgentifyConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn save(&self, config: &AgentifyConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        Ok(agentify_dir()?.join("config.yaml"))
    }
}

/// Read production/serverless signals through `lookup` (normally
/// `std::env::var`).
pub fn host_indicators(lookup: impl Fn(&str) -> Option<String>) -> HostIndicators {
    let set = |name: &str| {
        lookup(name).is_some_and(|v| {
            let v = v.trim();
            !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
        })
    };
    HostIndicators {
        production: lookup(ENV_VAR).is_some_and(|v| v.trim().eq_ignore_ascii_case("production")),
        serverless: SERVERLESS_VARS.iter().any(|name| set(name)),
    }
}

/// Build the execution environment from the config file and the host.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the home directory is
/// unknown.
pub fn resolve_environment(
    store: &impl ConfigStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ExecutionEnvironment> {
    let config = store.load()?;
    let default_root = agentify_dir()?.join("builds");
    Ok(ExecutionEnvironment::resolve(
        &config,
        host_indicators(lookup),
        &default_root,
        &std::env::temp_dir(),
    ))
}
