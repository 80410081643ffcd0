//! Configuration for draftstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the draft store directory
    #[serde(default = "default_store_path", rename = "store-path")]
    pub store_path: PathBuf,
}

/// Default location shared with the `pf` binary
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptforge")
        .join("drafts")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("draftstore").join("config.yml")),
            Some(PathBuf::from("draftstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_override() {
        let config: Config = serde_yaml::from_str("store-path: /tmp/elsewhere\n").unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn test_empty_config_uses_default_path() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.store_path.ends_with("promptforge/drafts"));
    }
}
