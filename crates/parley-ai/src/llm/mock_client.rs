//! Deterministic mock generation client for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::error::{AiError, ErrorKind, Result};
use crate::llm::client::{
    finalize_reply, CompletionRequest, CompletionResponse, LlmClient, Message,
};

/// Scripted step for mock completions.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Return an assistant reply.
    Text(String),
    /// Fail with the given classification.
    Fail(ErrorKind),
    /// Sleep before answering, to exercise caller-side timeouts.
    Stall(u64),
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn fail(kind: ErrorKind) -> Self {
        Self::Fail(kind)
    }

    pub fn stall_ms(delay_ms: u64) -> Self {
        Self::Stall(delay_ms)
    }
}

/// A scripted mock client; each call consumes the next step.
///
/// An exhausted script keeps answering with the default reply, so tests only
/// script the interesting part.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    script: Arc<Mutex<VecDeque<MockStep>>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<MockStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: always reply with the same text.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::from_steps(vec![MockStep::text(text)])
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists of every request received, in call order.
    pub async fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().await.clone()
    }

    fn scripted_error(kind: ErrorKind) -> AiError {
        let status = match kind {
            ErrorKind::RateLimited | ErrorKind::QuotaExhausted => 429,
            ErrorKind::Transient => 503,
            ErrorKind::Fatal => 400,
        };
        AiError::Http {
            provider: "mock".to_string(),
            status,
            message: "scripted failure".to_string(),
            kind,
            retry_after_secs: None,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.messages);

        let step = self.script.lock().await.pop_front();
        match step {
            Some(MockStep::Text(content)) => Ok(CompletionResponse {
                content: finalize_reply(Some(content)),
                usage: None,
            }),
            Some(MockStep::Fail(kind)) => Err(Self::scripted_error(kind)),
            Some(MockStep::Stall(delay_ms)) => {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(CompletionResponse {
                    content: "late".to_string(),
                    usage: None,
                })
            }
            None => Ok(CompletionResponse {
                content: "ok".to_string(),
                usage: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let client = MockLlmClient::from_steps(vec![
            MockStep::text("first"),
            MockStep::text("second"),
        ]);

        let request = CompletionRequest::new(vec![Message::user("hi")]);
        let first = client.complete(request.clone()).await.unwrap();
        let second = client.complete(request).await.unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_uses_default() {
        let client = MockLlmClient::new();
        let response = client
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn test_scripted_failure_classification() {
        let client = MockLlmClient::from_steps(vec![MockStep::fail(ErrorKind::QuotaExhausted)]);
        let error = client
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::QuotaExhausted);
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let client = MockLlmClient::replying("pong");
        client
            .complete(CompletionRequest::new(vec![
                Message::system("persona"),
                Message::user("ping"),
            ]))
            .await
            .unwrap();

        let requests = client.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[0][1].content, "ping");
    }
}
