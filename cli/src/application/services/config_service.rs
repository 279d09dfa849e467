//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::AgentifyConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the store cannot read or parse the config.
pub fn load_config(store: &impl ConfigStore) -> Result<AgentifyConfig> {
    store.load()
}

/// Validate `key = value`, apply it, and persist the result.
///
/// Nothing is written when validation fails.
///
/// # Errors
///
/// Returns an error if the key or value is invalid or the store cannot save.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<AgentifyConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}
