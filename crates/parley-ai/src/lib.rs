//! Generation backend client layer for Parley.
//!
//! Wraps the external chat completion API behind the [`LlmClient`] trait,
//! with per-attempt timeouts, retry-with-backoff and typed failure
//! classification. Callers decide what to do from [`ErrorKind`], never from
//! error message text.

pub mod error;
pub mod llm;

pub use error::{AiError, ErrorKind, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmClient, Message, MockLlmClient, MockStep,
    OpenAIClient, RetryConfig, Role, TokenUsage,
};
