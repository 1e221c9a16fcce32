//! LLM module - generation backend client abstraction

mod client;
mod mock_client;
mod openai;
mod retry;

pub use client::{
    finalize_reply, CompletionRequest, CompletionResponse, LlmClient, Message, Role, TokenUsage,
    EMPTY_REPLY_FALLBACK, MAX_REPLY_CHARS,
};
pub use mock_client::{MockLlmClient, MockStep};
pub use openai::OpenAIClient;
pub use retry::{parse_retry_after, response_to_error, RetryConfig};
