//! LLM client module
//!
//! Provider clients behind the [`LlmClient`] trait. Each client performs one
//! HTTP call per request; there is no retry loop at this layer.

use std::fmt;
use std::time::Duration;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

/// Everything a provider client needs, credentials included
#[derive(Clone)]
pub struct ClientConfig {
    /// Provider-side model name
    pub model: String,
    /// API key read from the environment
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Upper bound on response tokens
    pub max_tokens: u32,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Turn a non-success HTTP response into an [`LlmError`]
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status().as_u16();

    if status == 429 {
        debug!("error_for_status: rate limited (429)");
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        return Err(LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        });
    }

    if !response.status().is_success() {
        debug!(%status, "error_for_status: API error");
        let text = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, message: text });
    }

    Ok(response)
}
