//! Account, policy and path configuration.

use std::path::{Path, PathBuf};

use furio_executor::{Account, PolicyError, Preset, RunPolicy, SigningKey};
use thiserror::Error;

/// Errors resolving startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(String),

    #[error("environment variable {0} is empty")]
    EmptyVar(String),

    #[error("wallet count must be at least 1")]
    NoAccounts,

    #[error("failed to read policy file {path}: {source}")]
    PolicyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("no data directory available; pass --state-path")]
    NoDataDir,
}

/// Load `count` accounts from `ADR_{n}` / `PVK_{n}` through `lookup`.
pub fn load_accounts<F>(count: usize, lookup: F) -> Result<Vec<Account>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if count == 0 {
        return Err(ConfigError::NoAccounts);
    }

    let required = |name: String| -> Result<String, ConfigError> {
        match lookup(&name) {
            None => Err(ConfigError::MissingVar(name)),
            Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyVar(name)),
            Some(value) => Ok(value.trim().to_string()),
        }
    };

    (1..=count)
        .map(|index| -> Result<Account, ConfigError> {
            let address = required(format!("ADR_{}", index))?;
            let key = required(format!("PVK_{}", index))?;
            Ok(Account::new(index, address, SigningKey::new(key)))
        })
        .collect()
}

/// Load accounts from the process environment.
pub fn load_accounts_from_env(count: usize) -> Result<Vec<Account>, ConfigError> {
    load_accounts(count, |name| std::env::var(name).ok())
}

/// Resolve the policy: a TOML file wins over a named preset.
pub fn resolve_policy(preset: &str, file: Option<&Path>) -> Result<RunPolicy, ConfigError> {
    match file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyFile {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(RunPolicy::from_toml_str(&text)?)
        }
        None => Ok(RunPolicy::preset(preset.parse::<Preset>()?)),
    }
}

/// The state file path, defaulting to `<data dir>/furio/schedule.json`.
pub fn state_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path),
        None => dirs::data_dir()
            .map(|dir| dir.join("furio").join("schedule.json"))
            .ok_or(ConfigError::NoDataDir),
    }
}
