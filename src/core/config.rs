//! Project configuration: `<project>/.clrvote/config.toml`.
//!
//! A missing file means defaults; only `init` writes it.

use crate::core::error::LedgerError;
use crate::core::hash::AgentPubKey;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_DIR: &str = ".clrvote";
pub const CONFIG_FILE: &str = "config.toml";
pub const DATA_DIR: &str = "data";
/// Overrides project discovery when set.
pub const DIR_ENV: &str = "CLRVOTE_DIR";

pub const DEFAULT_APP_ID: &str = "CLR-VotingProgram";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default)]
    pub agent_pub_key: Option<AgentPubKey>,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_id: default_app_id(),
            agent_pub_key: None,
            trace: TraceConfig::default(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig { enabled: true }
    }
}

impl Config {
    pub fn agent(&self) -> Result<AgentPubKey, LedgerError> {
        self.agent_pub_key.ok_or_else(|| {
            LedgerError::ConfigError(
                "no agent_pub_key configured. Run `clrvote init` first.".to_string(),
            )
        })
    }
}

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(CONFIG_FILE)
}

pub fn store_root(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(DATA_DIR)
}

pub fn load_config(project_root: &Path) -> Result<Config, LedgerError> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| LedgerError::ConfigError(format!("{}: {}", path.display(), e)))
}

pub fn save_config(project_root: &Path, config: &Config) -> Result<(), LedgerError> {
    let path = config_path(project_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string(config).map_err(|e| LedgerError::ConfigError(e.to_string()))?;
    fs::write(&path, body)?;
    Ok(())
}

/// Fresh agent identity for a new project.
pub fn generate_agent_key(project_root: &Path) -> AgentPubKey {
    let seed = format!("{}:{}", project_root.display(), time::new_event_id());
    AgentPubKey::digest(seed.as_bytes())
}

/// Walk up from `start_dir` to the first directory containing `.clrvote`.
/// `CLRVOTE_DIR` wins when set.
pub fn find_project_root(start_dir: &Path) -> Result<PathBuf, LedgerError> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(PROJECT_DIR).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(LedgerError::NotFound(
                "'.clrvote' directory not found in current or parent directories. Run `clrvote init` first.".to_string(),
            ));
        }
    }
}
