//! PromptForge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::trial::Provider;

/// Main PromptForge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Live preview settings
    pub preview: PreviewConfig,

    /// Draft autosave settings
    pub drafts: DraftsConfig,

    /// Trial run settings
    pub trial: TrialConfig,

    /// Model provider endpoints and credentials
    pub providers: ProvidersConfig,

    /// Clipboard integration
    pub clipboard: ClipboardConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .promptforge.yml
        let local_config = PathBuf::from(".promptforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/promptforge/promptforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("promptforge").join("promptforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Live preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Quiet period before badges and preview refresh
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Draft autosave settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftsConfig {
    /// Inactivity period before a draft is saved
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// Directory of the file-backed draft store
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,
}

impl DraftsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            store_dir: draftstore::config::default_store_path(),
        }
    }
}

/// Trial run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Minimum spacing between accepted trials
    #[serde(rename = "cooldown-ms")]
    pub cooldown_ms: u64,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Optional system prompt sent with every trial
    #[serde(rename = "system-prompt")]
    pub system_prompt: Option<String>,
}

impl TrialConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            max_tokens: 1024,
            timeout_ms: 60_000,
            system_prompt: None,
        }
    }
}

/// Per-provider endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenAI => &self.openai,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig {
                api_key_env: "ANTHROPIC_API_KEY".to_string(),
                base_url: "https://api.anthropic.com".to_string(),
            },
            openai: ProviderConfig {
                api_key_env: "OPENAI_API_KEY".to_string(),
                base_url: "https://api.openai.com".to_string(),
            },
        }
    }
}

/// A single provider's endpoint and credential source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Clipboard integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Command that reads the text to copy on stdin
    pub command: String,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        let command = if cfg!(target_os = "macos") { "pbcopy" } else { "wl-copy" };
        Self {
            command: command.to_string(),
        }
    }
}
