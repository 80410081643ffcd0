//! LLM request/response types
//!
//! Text-only: a trial sends one user message and reads back one text reply.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system prompt
    pub system_prompt: Option<String>,

    /// Conversation messages (a trial sends exactly one)
    pub messages: Vec<Message>,

    /// Max tokens for the response
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// A single-turn request carrying `prompt` as the user message
    pub fn single(prompt: impl Into<String>, system_prompt: Option<String>, max_tokens: u32) -> Self {
        Self {
            system_prompt,
            messages: vec![Message::user(prompt)],
            max_tokens,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Message role; trials only ever speak as the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A plain text response, mostly useful for test doubles
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    /// Whether the reply was cut off by the token limit
    pub fn is_truncated(&self) -> bool {
        matches!(self, StopReason::MaxTokens)
    }

    /// Parse from Anthropic API stop_reason string
    pub fn from_anthropic(s: &str) -> Self {
        match s {
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            other => {
                debug!(%other, "StopReason::from_anthropic: unrecognized");
                StopReason::Other(other.to_string())
            }
        }
    }

    /// Parse from OpenAI API finish_reason string
    pub fn from_openai(s: &str) -> Self {
        match s {
            "stop" => StopReason::EndTurn,
            "length" => StopReason::MaxTokens,
            other => {
                debug!(%other, "StopReason::from_openai: unrecognized");
                StopReason::Other(other.to_string())
            }
        }
    }
}

/// Token usage as reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let req = CompletionRequest::single("Hello", None, 100);
        assert_eq!(req.messages, vec![Message::user("Hello")]);
        assert_eq!(req.max_tokens, 100);
    }

    #[test]
    fn test_stop_reasons() {
        assert_eq!(StopReason::from_anthropic("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_anthropic("max_tokens"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_openai("length"), StopReason::MaxTokens);
        assert_eq!(
            StopReason::from_openai("content_filter"),
            StopReason::Other("content_filter".to_string())
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert!(json.contains("\"user\""));
    }

    #[test]
    fn test_only_max_tokens_is_truncated() {
        assert!(StopReason::MaxTokens.is_truncated());
        assert!(!StopReason::EndTurn.is_truncated());
        assert!(!StopReason::Other("content_filter".to_string()).is_truncated());
    }
}
