//! Model to backend resolution

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{ModelId, Provider, TrialError};
use crate::config::{Config, ProvidersConfig};
use crate::llm::{AnthropicClient, ClientConfig, LlmClient, OpenAIClient};

/// Single lookup from a model to a ready client
pub trait BackendResolver: Send + Sync {
    /// Resolve `model` without network I/O
    fn resolve(&self, model: ModelId) -> Result<Arc<dyn LlmClient>, TrialError>;
}

/// Resolves models against the provider configuration and process environment
#[derive(Debug, Clone)]
pub struct ConfiguredBackends {
    providers: ProvidersConfig,
    max_tokens: u32,
    timeout: Duration,
}

impl ConfiguredBackends {
    pub fn new(providers: ProvidersConfig, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            providers,
            max_tokens,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.providers.clone(), config.trial.max_tokens, config.trial.timeout())
    }

    /// Environment variable holding the key for `model`
    pub fn credential_env(&self, model: ModelId) -> &str {
        &self.providers.get(model.provider()).api_key_env
    }

    /// Whether the credential for `model` is present
    pub fn has_credentials(&self, model: ModelId) -> bool {
        std::env::var(self.credential_env(model)).is_ok_and(|key| !key.trim().is_empty())
    }

    fn client_config(&self, model: ModelId) -> Result<ClientConfig, TrialError> {
        let provider = self.providers.get(model.provider());
        let api_key = std::env::var(&provider.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TrialError::MissingCredentials {
                model,
                env_var: provider.api_key_env.clone(),
            })?;

        Ok(ClientConfig {
            model: model.api_model_name().to_string(),
            api_key,
            base_url: provider.base_url.clone(),
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        })
    }
}

impl BackendResolver for ConfiguredBackends {
    fn resolve(&self, model: ModelId) -> Result<Arc<dyn LlmClient>, TrialError> {
        debug!(%model, provider = %model.provider(), "ConfiguredBackends::resolve: called");
        let config = self.client_config(model)?;
        let upstream = |e: crate::llm::LlmError| TrialError::Upstream {
            model,
            message: e.to_string(),
        };

        let client: Arc<dyn LlmClient> = match model.provider() {
            Provider::Anthropic => Arc::new(AnthropicClient::from_config(&config).map_err(upstream)?),
            Provider::OpenAI => Arc::new(OpenAIClient::from_config(&config).map_err(upstream)?),
        };
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn backends(env_var: &str) -> ConfiguredBackends {
        let provider = ProviderConfig {
            api_key_env: env_var.to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        };
        ConfiguredBackends::new(
            ProvidersConfig {
                anthropic: provider.clone(),
                openai: provider,
            },
            256,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_missing_credentials_names_model() {
        let backends = backends("PROMPTFORGE_TEST_KEY_THAT_IS_NEVER_SET");
        match backends.resolve(ModelId::ClaudeSonnet) {
            Err(TrialError::MissingCredentials { model, env_var }) => {
                assert_eq!(model, ModelId::ClaudeSonnet);
                assert_eq!(env_var, "PROMPTFORGE_TEST_KEY_THAT_IS_NEVER_SET");
            }
            Err(other) => panic!("expected MissingCredentials, got {:?}", other),
            Ok(_) => panic!("expected MissingCredentials"),
        }
        assert!(!backends.has_credentials(ModelId::Gpt4o));
    }

    #[test]
    fn test_resolves_with_credentials() {
        // PATH is always set, so it doubles as a present credential
        let backends = backends("PATH");
        assert!(backends.has_credentials(ModelId::Gpt4oMini));
        assert!(backends.resolve(ModelId::Gpt4oMini).is_ok());
        assert!(backends.resolve(ModelId::ClaudeHaiku).is_ok());
    }
}
