//! Channel trait definitions.

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{ChannelType, InboundMessage, OutboundMessage};

/// A bidirectional communication channel.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get channel type
    fn channel_type(&self) -> ChannelType;

    /// Get channel display name
    fn name(&self) -> &str {
        self.channel_type().display_name()
    }

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(conversation_id, text)).await
    }

    /// Show a typing indicator for the conversation, if supported.
    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        let _ = conversation_id;
        Ok(())
    }

    /// Start receiving messages (returns None if channel doesn't support receiving)
    ///
    /// The returned stream should be consumed from a background task;
    /// messages are yielded as they arrive from the channel.
    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>>;
}

/// Channel that receives via long-polling.
#[async_trait]
pub trait StreamReceiver: Channel {
    /// Stop the polling loop
    async fn stop_polling(&self) -> Result<()>;

    /// Check if polling is currently active
    fn is_polling(&self) -> bool;
}

/// Test channel that records sent messages.
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// A mock channel for tests; captures everything sent through it.
    #[derive(Default)]
    pub struct MockChannel {
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
        typing: Arc<Mutex<Vec<String>>>,
    }

    impl MockChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
            self.sent.lock().await.clone()
        }

        pub async fn typing_events(&self) -> Vec<String> {
            self.typing.lock().await.clone()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn channel_type(&self) -> ChannelType {
            ChannelType::Telegram
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            self.sent.lock().await.push(message);
            Ok(())
        }

        async fn send_typing(&self, conversation_id: &str) -> Result<()> {
            self.typing.lock().await.push(conversation_id.to_string());
            Ok(())
        }

        fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockChannel;
    use super::*;

    #[tokio::test]
    async fn test_mock_channel_records_sends() {
        let channel = MockChannel::new();
        channel.send(OutboundMessage::new("chat-1", "hello")).await.unwrap();

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "hello");
    }

    #[tokio::test]
    async fn test_send_text_convenience() {
        let channel = MockChannel::new();
        channel.send_text("chat-2", "quick").await.unwrap();

        let sent = channel.sent_messages().await;
        assert_eq!(sent[0].conversation_id, "chat-2");
        assert_eq!(sent[0].content, "quick");
    }

    #[tokio::test]
    async fn test_typing_recorded() {
        let channel = MockChannel::new();
        channel.send_typing("chat-3").await.unwrap();
        assert_eq!(channel.typing_events().await, vec!["chat-3".to_string()]);
    }

    #[tokio::test]
    async fn test_channel_defaults() {
        let channel = MockChannel::new();
        assert_eq!(channel.name(), "Telegram");
        assert!(channel.is_configured());
    }
}
