//! Chat dispatcher - orchestrates one inbound message end to end.
//!
//! Per message the dispatcher runs command routing, the admission gate,
//! style accumulation, prompt assembly, the backend call with a timeout,
//! and finally the paired session append plus the reply. Any failure past
//! the gate becomes a user-facing notice; nothing here aborts the process.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use parley_ai::{CompletionRequest, ErrorKind, LlmClient};

use crate::channel::{Channel, InboundMessage, OutboundMessage};
use crate::gate::AdmissionGate;
use crate::memory::{ConversationKey, SessionStore};
use crate::prompt::PromptAssembler;
use crate::style::StyleAccumulator;

const THROTTLE_NOTICE: &str = "Easy there. Give me a few seconds between messages.";
const NOT_AUTHORIZED_NOTICE: &str = "That command is reserved.";
const UNKNOWN_COMMAND_NOTICE: &str = "Unknown command. Try /help.";
const GREETING: &str = "Hi! Just talk to me. /help lists the commands.";
const HELP_TEXT: &str = "Commands:\n\
    /reset - forget this conversation's history\n\
    /ping - check that I'm alive\n\
    /help - this message\n\
    Anything else is treated as conversation.";

/// Configuration for the ChatDispatcher.
#[derive(Debug, Clone)]
pub struct ChatDispatcherConfig {
    /// Sampling temperature passed to the backend.
    pub temperature: f32,
    /// Backend response timeout in seconds.
    pub response_timeout_secs: u64,
    /// Whether to send typing indicator while processing.
    pub send_typing_indicator: bool,
}

impl Default for ChatDispatcherConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            response_timeout_secs: 180,
            send_typing_indicator: true,
        }
    }
}

/// Error types for chat operations.
#[derive(Debug)]
pub enum ChatError {
    /// Backend rejected for rate limiting and retries did not help.
    RateLimited,
    /// Account quota or billing exhausted; retrying is pointless.
    QuotaExhausted,
    /// Backend unavailable after exhausting retries.
    Unavailable,
    /// Non-retryable backend failure (bad request, auth, malformed reply).
    Backend(String),
    /// Overall response deadline elapsed.
    Timeout,
}

impl ChatError {
    /// Get a user-friendly error message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::RateLimited => "Too many requests right now. Please wait a moment and try again.",
            Self::QuotaExhausted => {
                "The usage quota is exhausted. I can't answer until it is topped up."
            }
            Self::Unavailable => "The backend is unavailable at the moment. Please try again soon.",
            Self::Backend(_) => "Something went wrong while generating a reply. Please try again.",
            Self::Timeout => "That took too long to answer. Please try again.",
        }
    }

    fn from_ai(error: &parley_ai::AiError) -> Self {
        match error.kind() {
            ErrorKind::RateLimited => Self::RateLimited,
            ErrorKind::QuotaExhausted => Self::QuotaExhausted,
            ErrorKind::Transient => Self::Unavailable,
            ErrorKind::Fatal => Self::Backend(error.to_string()),
        }
    }
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "Rate limited"),
            Self::QuotaExhausted => write!(f, "Quota exhausted"),
            Self::Unavailable => write!(f, "Backend unavailable"),
            Self::Backend(msg) => write!(f, "Backend failure: {}", msg),
            Self::Timeout => write!(f, "Response timeout"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Dispatches conversational messages to the generation backend.
pub struct ChatDispatcher {
    gate: Arc<AdmissionGate>,
    sessions: Arc<SessionStore>,
    style: Arc<StyleAccumulator>,
    assembler: PromptAssembler,
    llm: Arc<dyn LlmClient>,
    channel: Arc<dyn Channel>,
    config: ChatDispatcherConfig,
}

impl ChatDispatcher {
    pub fn new(
        gate: Arc<AdmissionGate>,
        sessions: Arc<SessionStore>,
        style: Arc<StyleAccumulator>,
        assembler: PromptAssembler,
        llm: Arc<dyn LlmClient>,
        channel: Arc<dyn Channel>,
        config: ChatDispatcherConfig,
    ) -> Self {
        Self {
            gate,
            sessions,
            style,
            assembler,
            llm,
            channel,
            config,
        }
    }

    /// Handle one inbound message end to end.
    pub async fn dispatch(&self, message: &InboundMessage) -> Result<()> {
        let text = message.content.trim();
        if text.is_empty() {
            debug!("Skipping empty message {}", message.id);
            return Ok(());
        }

        let key = ConversationKey::from_inbound(message);

        // Commands are control traffic: handled before the gate, never
        // recorded as style or session content.
        if message.is_command() {
            return self.handle_command(message, &key, text).await;
        }

        // Gate rejection is the only path that skips the backend entirely.
        if !self.gate.try_acquire(&key, Instant::now()) {
            debug!(key = %key, "Throttled");
            return self.channel.send_text(&message.conversation_id, THROTTLE_NOTICE).await;
        }

        self.style.record(&message.sender_id, text);

        if self.config.send_typing_indicator {
            if let Err(e) = self.channel.send_typing(&message.conversation_id).await {
                warn!("Failed to send typing indicator: {}", e);
            }
        }

        let history = self.sessions.snapshot(&key);
        let persona = match self.style.primary() {
            Some(primary) => self.style.render_prefix(primary),
            None => self.style.render_prefix(&message.sender_id),
        };
        let messages = self.assembler.build(&persona, &history, text);
        let request =
            CompletionRequest::new(messages).with_temperature(self.config.temperature);

        let reply = match tokio::time::timeout(
            tokio::time::Duration::from_secs(self.config.response_timeout_secs),
            self.llm.complete(request),
        )
        .await
        {
            Ok(Ok(response)) => response.content,
            Ok(Err(e)) => {
                error!(key = %key, kind = ?e.kind(), "Generation failed: {}", e);
                return self.send_error_response(message, ChatError::from_ai(&e)).await;
            }
            Err(_) => {
                error!(key = %key, "Generation timed out");
                return self.send_error_response(message, ChatError::Timeout).await;
            }
        };

        // The pair lands only after a successful generation, so a failed
        // call never leaves a lone user turn in the session.
        self.sessions.append_exchange(&key, text, &reply);

        self.channel
            .send(OutboundMessage::new(&message.conversation_id, &reply))
            .await?;

        info!(key = %key, chars = reply.len(), "Reply sent");
        Ok(())
    }

    async fn handle_command(
        &self,
        message: &InboundMessage,
        key: &ConversationKey,
        text: &str,
    ) -> Result<()> {
        let command = text.split_whitespace().next().unwrap_or(text);
        debug!(key = %key, command, "Handling command");

        let reply = match command {
            "/reset" => {
                self.sessions.clear(key);
                "History cleared. Fresh start.".to_string()
            }
            "/style_reset" => {
                if !self.style.is_privileged(&message.sender_id) {
                    NOT_AUTHORIZED_NOTICE.to_string()
                } else {
                    self.style.reset(&message.sender_id);
                    "Style corpus cleared.".to_string()
                }
            }
            "/style_reload" => {
                if !self.style.is_privileged(&message.sender_id) {
                    NOT_AUTHORIZED_NOTICE.to_string()
                } else {
                    let loaded = self.style.reload_from_file();
                    format!("Style corpus reloaded: {} samples.", loaded)
                }
            }
            "/ping" => "pong".to_string(),
            "/start" => GREETING.to_string(),
            "/help" => HELP_TEXT.to_string(),
            _ => UNKNOWN_COMMAND_NOTICE.to_string(),
        };

        self.channel.send_text(&message.conversation_id, &reply).await
    }

    /// Send an error response to the user.
    async fn send_error_response(&self, message: &InboundMessage, error: ChatError) -> Result<()> {
        self.channel
            .send_text(&message.conversation_id, error.user_message())
            .await
    }
}
