//! Channel message handler.
//!
//! Consumes the channel's inbound stream and hands each message to the
//! dispatcher on its own task, so one slow generation never blocks the
//! stream. If the stream ends the handler reconnects after a short delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::channel::Channel;

use super::dispatcher::ChatDispatcher;

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Start the message handler loop.
///
/// Spawns a background task that listens on the channel and dispatches every
/// inbound message. Returns immediately.
pub fn start_message_handler(channel: Arc<dyn Channel>, dispatcher: Arc<ChatDispatcher>) {
    tokio::spawn(async move {
        info!("Listening for messages on {}", channel.name());

        loop {
            let Some(mut stream) = channel.start_receiving() else {
                warn!(
                    "Failed to start message stream on {}, retrying in {:?}",
                    channel.name(),
                    STREAM_RECONNECT_DELAY
                );
                sleep(STREAM_RECONNECT_DELAY).await;
                continue;
            };

            while let Some(message) = stream.next().await {
                debug!(
                    "Handler received message {} from {}",
                    message.id, message.conversation_id
                );

                // Per-message task: a stalled generation in one conversation
                // must not delay the others.
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = dispatcher.dispatch(&message).await {
                        error!(
                            "Error handling message {} from {}: {}",
                            message.id, message.conversation_id, e
                        );
                    }
                });
            }

            warn!(
                "Message stream ended on {}, restarting in {:?}",
                channel.name(),
                STREAM_RECONNECT_DELAY
            );
            sleep(STREAM_RECONNECT_DELAY).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelType, InboundMessage, OutboundMessage};
    use crate::gate::AdmissionGate;
    use crate::memory::SessionStore;
    use crate::prompt::PromptAssembler;
    use crate::runtime::dispatcher::ChatDispatcherConfig;
    use crate::style::StyleAccumulator;
    use anyhow::Result;
    use async_trait::async_trait;
    use futures::Stream;
    use parley_ai::MockLlmClient;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio::time::timeout;
    use tokio_stream::iter;

    struct ReconnectTestChannel {
        streams: Mutex<VecDeque<Vec<InboundMessage>>>,
        sent_messages: Arc<AsyncMutex<Vec<OutboundMessage>>>,
        start_calls: Arc<AtomicUsize>,
    }

    impl ReconnectTestChannel {
        fn new(batches: Vec<Vec<InboundMessage>>) -> Self {
            Self {
                streams: Mutex::new(VecDeque::from(batches)),
                sent_messages: Arc::new(AsyncMutex::new(Vec::new())),
                start_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Channel for ReconnectTestChannel {
        fn channel_type(&self) -> ChannelType {
            ChannelType::Telegram
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            self.sent_messages.lock().await.push(message);
            Ok(())
        }

        fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            let mut streams = self.streams.lock().expect("lock test streams");
            let batch = streams.pop_front()?;
            Some(Box::pin(iter(batch)))
        }
    }

    fn dispatcher_for(channel: Arc<dyn Channel>) -> Arc<ChatDispatcher> {
        Arc::new(ChatDispatcher::new(
            Arc::new(AdmissionGate::new(Duration::from_secs(0))),
            Arc::new(SessionStore::new(20).unwrap()),
            Arc::new(StyleAccumulator::new(Vec::new(), 10, None).unwrap()),
            PromptAssembler::new(2000),
            Arc::new(MockLlmClient::replying("ok")),
            channel,
            ChatDispatcherConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_handler_recovers_after_stream_ends() {
        let first =
            InboundMessage::new("msg-1", ChannelType::Telegram, "user-1", "chat-1", "first");
        let second =
            InboundMessage::new("msg-2", ChannelType::Telegram, "user-1", "chat-1", "second");

        let channel = Arc::new(ReconnectTestChannel::new(vec![vec![first], vec![second]]));
        let sent_messages = channel.sent_messages.clone();
        let start_calls = channel.start_calls.clone();

        let dispatcher = dispatcher_for(channel.clone());
        start_message_handler(channel, dispatcher);

        timeout(Duration::from_secs(2), async {
            loop {
                let send_count = sent_messages.lock().await.len();
                let stream_start_count = start_calls.load(Ordering::SeqCst);
                if send_count >= 2 && stream_start_count >= 2 {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("message handler should reconnect after stream end");
    }
}
