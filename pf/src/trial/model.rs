//! Closed set of trial models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TrialError;

/// Model provider behind a [`ModelId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

/// A model a trial can run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelId {
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    ClaudeSonnet,
    ClaudeHaiku,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::Gpt4oMini,
        ModelId::Gpt4o,
        ModelId::ClaudeSonnet,
        ModelId::ClaudeHaiku,
    ];

    /// User-facing identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gpt4oMini => "gpt-4o-mini",
            ModelId::Gpt4o => "gpt-4o",
            ModelId::ClaudeSonnet => "claude-sonnet",
            ModelId::ClaudeHaiku => "claude-haiku",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ModelId::Gpt4oMini | ModelId::Gpt4o => Provider::OpenAI,
            ModelId::ClaudeSonnet | ModelId::ClaudeHaiku => Provider::Anthropic,
        }
    }

    /// Model name sent to the provider API
    pub fn api_model_name(&self) -> &'static str {
        match self {
            ModelId::Gpt4oMini => "gpt-4o-mini",
            ModelId::Gpt4o => "gpt-4o",
            ModelId::ClaudeSonnet => "claude-sonnet-4-20250514",
            ModelId::ClaudeHaiku => "claude-3-5-haiku-20241022",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = TrialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TrialError::InvalidModel { id: s.to_string() })
    }
}
