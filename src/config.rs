use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_CONFIG, ENV_STORE, ENV_VERBOSE, MAX_FILES_TO_SHOW,
    WATCH_DEBOUNCE_MS,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// user preferences, read from `config.json` in the platform config directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// where groups are persisted; relative paths are taken from the working tree root.
    /// defaults to a file inside the repository's git directory
    pub store_path: Option<PathBuf>,

    /// re-render the change view after commands that modify state
    pub refresh_after_mutation: bool,

    /// ask before deleting groups or discarding changes
    pub confirm_destructive: bool,

    /// number of files listed when confirming a commit
    pub max_files_to_show: usize,

    /// quiet period before reacting to file system events in `watch`
    pub watch_debounce_ms: u64,

    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            refresh_after_mutation: true,
            confirm_destructive: true,
            max_files_to_show: MAX_FILES_TO_SHOW,
            watch_debounce_ms: WATCH_DEBOUNCE_MS,
            verbose: false,
        }
    }
}

impl Config {
    /// location of the config file, honouring the override variable
    pub fn path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        match env(ENV_CONFIG) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
        }
    }

    /// load the config file (if any) and apply environment overrides
    pub fn load(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match Self::path(&env) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    /// a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(store) = env(ENV_STORE).filter(|s| !s.is_empty()) {
            self.store_path = Some(PathBuf::from(store));
        }
        if let Some(verbose) = env(ENV_VERBOSE) {
            self.verbose = !matches!(verbose.trim(), "" | "0" | "false" | "no");
        }
    }
}
