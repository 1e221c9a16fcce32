//! Telegram channel implementation.
//!
//! Bidirectional Bot API transport: long-polling `getUpdates` for inbound
//! text and `sendMessage` for replies, with forum-thread routing encoded in
//! the conversation id as "chat_id:thread_id".

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::traits::{Channel, StreamReceiver};
use super::types::{ChannelType, InboundMessage, OutboundMessage};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
/// Timeout for plain (non-polling) API calls, seconds
const API_TIMEOUT_SECS: u64 = 30;

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Long-polling timeout in seconds (default: 30)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
    /// Override the API base URL (tests)
    #[serde(skip)]
    pub api_base: Option<String>,
}

fn default_poll_timeout() -> u32 {
    30
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            poll_timeout_secs: default_poll_timeout(),
            api_base: None,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: u32) -> Self {
        self.poll_timeout_secs = timeout;
        self
    }
}

/// Telegram channel
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    polling_active: Arc<AtomicBool>,
    /// Last processed update ID for long-polling offsets
    last_update_id: Arc<AtomicI64>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    /// Split a conversation id into (chat_id, thread_id).
    fn parse_conversation_id(conversation_id: &str) -> (String, Option<i64>) {
        match conversation_id.split_once(':') {
            Some((chat, thread)) => (chat.to_string(), thread.parse::<i64>().ok()),
            None => (conversation_id.to_string(), None),
        }
    }

    fn build_conversation_id(chat_id: i64, message_thread_id: Option<i64>) -> String {
        match message_thread_id {
            Some(thread_id) => format!("{}:{}", chat_id, thread_id),
            None => chat_id.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(TELEGRAM_API_BASE);
        format!("{}{}/{}", base, self.config.bot_token, method)
    }

    async fn call_api<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout_secs: u64,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&params)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram HTTP error: {}", error));
        }

        let body: TelegramResponse<T> = response.json().await?;
        if !body.ok {
            return Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ));
        }
        body.result
            .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
    }

    /// Send a text message, routed to a forum thread when one is encoded in
    /// the conversation id.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
        message_thread_id: Option<i64>,
    ) -> Result<TelegramMessageResponse> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        // Our message ids look like "tg_12345"
        if let Some(reply_id) = reply_to_message_id {
            if let Some(numeric) = reply_id.strip_prefix("tg_") {
                if let Ok(id) = numeric.parse::<i64>() {
                    params["reply_to_message_id"] = serde_json::Value::Number(id.into());
                }
            }
        }

        if let Some(thread_id) = message_thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        self.call_api("sendMessage", params, API_TIMEOUT_SECS).await
    }

    /// Long-poll for new updates, advancing the stored offset.
    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.poll_timeout_secs,
            "allowed_updates": ["message"],
        });

        let updates: Vec<TelegramUpdate> = self
            .call_api(
                "getUpdates",
                params,
                self.config.poll_timeout_secs as u64 + 10,
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }

        Ok(updates)
    }

    /// Convert a Telegram update into an InboundMessage. Non-text updates
    /// and messages without a sender are dropped.
    fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let from = message.from?;
        let text = message.text?;

        let conversation_id =
            Self::build_conversation_id(message.chat.id, message.message_thread_id);

        let sender_name = from
            .username
            .clone()
            .or_else(|| {
                let mut name = from.first_name.clone().unwrap_or_default();
                if let Some(last) = &from.last_name {
                    if !name.is_empty() {
                        name.push(' ');
                    }
                    name.push_str(last);
                }
                Some(name)
            })
            .filter(|name| !name.is_empty());

        let mut metadata = serde_json::json!({
            "chat_type": message.chat.r#type,
            "update_id": update.update_id,
        });
        if let Some(thread_id) = message.message_thread_id {
            metadata["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        let mut inbound = InboundMessage::new(
            format!("tg_{}", message.message_id),
            ChannelType::Telegram,
            from.id.to_string(),
            conversation_id,
            text,
        )
        .with_metadata(metadata);
        if let Some(name) = sender_name {
            inbound = inbound.with_sender_name(name);
        }
        Some(inbound)
    }

    /// Health probe: `getMe` succeeds iff the token is valid and Telegram is
    /// reachable.
    pub async fn test_connection(&self) -> Result<TelegramUser> {
        self.call_api("getMe", serde_json::json!({}), API_TIMEOUT_SECS)
            .await
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let (chat_id, thread_id) = Self::parse_conversation_id(&message.conversation_id);
        self.send_message(
            &chat_id,
            &message.content,
            message.reply_to.as_deref(),
            thread_id,
        )
        .await?;
        Ok(())
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        let (chat_id, thread_id) = Self::parse_conversation_id(conversation_id);
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "action": "typing",
        });
        if let Some(thread_id) = thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }
        let _: bool = self
            .call_api("sendChatAction", params, API_TIMEOUT_SECS)
            .await?;
        debug!("Sent typing indicator to {}", conversation_id);
        Ok(())
    }

    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
        if !self.is_configured() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let polling_active = self.polling_active.clone();
        let channel = TelegramChannel {
            config: self.config.clone(),
            client: self.client.clone(),
            polling_active: polling_active.clone(),
            last_update_id: self.last_update_id.clone(),
        };

        tokio::spawn(async move {
            polling_active.store(true, Ordering::SeqCst);
            info!("Starting Telegram polling");

            while polling_active.load(Ordering::SeqCst) {
                match channel.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(message) = Self::convert_update(update) {
                                debug!(
                                    "Received Telegram message {} from {}",
                                    message.id, message.sender_id
                                );
                                if tx.send(message).is_err() {
                                    warn!("Message receiver dropped, stopping polling");
                                    polling_active.store(false, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Telegram polling error: {}", e);
                        // Back off on error
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }

            info!("Telegram polling stopped");
        });

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }
}

#[async_trait]
impl StreamReceiver for TelegramChannel {
    async fn stop_polling(&self) -> Result<()> {
        self.polling_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_polling(&self) -> bool {
        self.polling_active.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    message_thread_id: Option<i64>,
    text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    #[allow(dead_code)]
    message_id: i64,
}
