//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "Provider rate limited, retry after 60s");
    }

    #[test]
    fn test_api_error_message() {
        let err = LlmError::ApiError {
            status: 401,
            message: "invalid x-api-key".to_string(),
        };
        assert_eq!(err.to_string(), "API error 401: invalid x-api-key");
    }
}
