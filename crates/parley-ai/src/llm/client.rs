//! Generation client trait and message types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Hard cap on reply length delivered to the transport layer.
///
/// Telegram rejects messages longer than 4096 characters; the client is the
/// last point that sees the untruncated text, so the cap is applied here.
pub const MAX_REPLY_CHARS: usize = 4000;

/// Substitute for an empty or whitespace-only backend reply.
pub const EMPTY_REPLY_FALLBACK: &str = "I have nothing to say to that.";

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// Completion response
///
/// `content` has already been through `finalize_reply`: it is non-empty and
/// no longer than [`MAX_REPLY_CHARS`].
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalize a successful backend reply for delivery.
///
/// An empty or whitespace-only reply is a logical failure, not a network one:
/// it becomes the fixed fallback string and the call still counts as done.
/// Anything longer than [`MAX_REPLY_CHARS`] is cut at a char boundary.
pub fn finalize_reply(raw: Option<String>) -> String {
    let text = raw.unwrap_or_default();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return EMPTY_REPLY_FALLBACK.to_string();
    }

    if trimmed.chars().count() <= MAX_REPLY_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_REPLY_CHARS).collect()
}

/// Generation client trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Complete a chat request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        assert_eq!(Message::user("hello").content, "hello");
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new(vec![Message::user("hi")])
            .with_temperature(0.7)
            .with_max_tokens(256);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn test_finalize_reply_passthrough() {
        assert_eq!(finalize_reply(Some("hello".to_string())), "hello");
    }

    #[test]
    fn test_finalize_reply_trims() {
        assert_eq!(finalize_reply(Some("  hello \n".to_string())), "hello");
    }

    #[test]
    fn test_finalize_reply_empty_becomes_fallback() {
        assert_eq!(finalize_reply(None), EMPTY_REPLY_FALLBACK);
        assert_eq!(finalize_reply(Some(String::new())), EMPTY_REPLY_FALLBACK);
        assert_eq!(
            finalize_reply(Some("   \n\t ".to_string())),
            EMPTY_REPLY_FALLBACK
        );
    }

    #[test]
    fn test_finalize_reply_caps_length() {
        let long = "x".repeat(MAX_REPLY_CHARS + 500);
        let out = finalize_reply(Some(long));
        assert_eq!(out.chars().count(), MAX_REPLY_CHARS);
    }

    #[test]
    fn test_finalize_reply_cap_respects_char_boundaries() {
        let long = "ж".repeat(MAX_REPLY_CHARS + 1);
        let out = finalize_reply(Some(long));
        assert_eq!(out.chars().count(), MAX_REPLY_CHARS);
        assert!(out.chars().all(|c| c == 'ж'));
    }
}
