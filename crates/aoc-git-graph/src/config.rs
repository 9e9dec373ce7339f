use aoc_git_history::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_CONFIG_PATH: &str = "AOC_GIT_GRAPH_CONFIG";
pub const ENV_GIT_BIN: &str = "AOC_GIT_BIN";
pub const ENV_PAGE_SIZE: &str = "AOC_GIT_GRAPH_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub page_size: usize,
    pub all_branches: bool,
    pub git_binary: PathBuf,
    /// Rows left below the selection before the next page is requested.
    pub prefetch_margin: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            all_branches: false,
            git_binary: PathBuf::from("git"),
            prefetch_margin: 20,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    config_dir().join("aoc/git-graph.toml")
}

fn config_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_CONFIG_HOME") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config")
}

/// A missing file yields defaults; an unreadable or invalid one is reported
/// and also falls back to defaults.
pub fn load_config(path: &Path) -> GraphConfig {
    if !path.exists() {
        debug!(path = %path.display(), "no git graph config, using defaults");
        return GraphConfig::default();
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read git graph config");
            return GraphConfig::default();
        }
    };
    match toml::from_str::<GraphConfig>(&contents) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "invalid git graph config");
            GraphConfig::default()
        }
    }
}

pub fn apply_env_overrides(config: &mut GraphConfig) {
    apply_overrides_from(config, |key| env::var(key).ok());
}

fn apply_overrides_from(config: &mut GraphConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(binary) = lookup(ENV_GIT_BIN).filter(|value| !value.trim().is_empty()) {
        config.git_binary = PathBuf::from(binary.trim());
    }
    if let Some(raw) = lookup(ENV_PAGE_SIZE) {
        match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => config.page_size = size,
            _ => warn!(value = %raw, "ignoring invalid {ENV_PAGE_SIZE}"),
        }
    }
}
