//! Session store - per-conversation bounded history.
//!
//! Sessions are keyed by (chat, thread, user), created lazily and kept for
//! the process lifetime. Keys are never evicted; that unbounded growth is a
//! known tradeoff of this in-memory design.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::ring::RingBuffer;
use crate::channel::InboundMessage;
use crate::config::ConfigError;

/// Who said an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One turn of a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

impl Utterance {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Identifies one conversation buffer: chat, optional forum thread, sender.
///
/// Two users in the same group chat get independent histories, as do the
/// same user's messages in two forum threads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat_id: String,
    pub thread_id: Option<i64>,
    pub user_id: String,
}

impl ConversationKey {
    pub fn new(
        chat_id: impl Into<String>,
        thread_id: Option<i64>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            thread_id,
            user_id: user_id.into(),
        }
    }

    /// Derive the key from an inbound message. The conversation_id carries
    /// "chat" or "chat:thread" (the channel layer's convention).
    pub fn from_inbound(message: &InboundMessage) -> Self {
        let (chat_id, thread_id) = match message.conversation_id.split_once(':') {
            Some((chat, thread)) => (chat.to_string(), thread.parse::<i64>().ok()),
            None => (message.conversation_id.clone(), None),
        };
        Self {
            chat_id,
            thread_id,
            user_id: message.sender_id.clone(),
        }
    }

    /// Rebuild the channel-layer conversation id ("chat" or "chat:thread").
    pub fn conversation_id(&self) -> String {
        match self.thread_id {
            Some(thread) => format!("{}:{}", self.chat_id, thread),
            None => self.chat_id.clone(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.thread_id {
            Some(thread) => write!(f, "{}:{}/{}", self.chat_id, thread, self.user_id),
            None => write!(f, "{}/{}", self.chat_id, self.user_id),
        }
    }
}

/// In-memory store of conversation sessions.
///
/// Every read-modify-write against a single key happens under one lock, so
/// the user/assistant pair append is transactional: a failed generation call
/// never leaves a lone user turn behind, because nothing is appended until
/// both turns exist.
pub struct SessionStore {
    sessions: Mutex<HashMap<ConversationKey, RingBuffer<Utterance>>>,
    capacity: usize,
}

impl SessionStore {
    /// Create a store whose sessions each hold `capacity` utterances.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        // Validate once here so lazy creation below cannot fail.
        RingBuffer::<Utterance>::new(capacity)?;
        Ok(Self {
            sessions: Mutex::new(HashMap::new()),
            capacity,
        })
    }

    /// Ordered copy of a session's history, creating the session if absent.
    pub fn snapshot(&self, key: &ConversationKey) -> Vec<Utterance> {
        let mut sessions = self.sessions.lock();
        self.entry(&mut sessions, key).snapshot()
    }

    /// Append a completed (user, assistant) exchange as one atomic batch.
    pub fn append_exchange(&self, key: &ConversationKey, user_text: &str, assistant_text: &str) {
        let mut sessions = self.sessions.lock();
        let session = self.entry(&mut sessions, key);
        session.push(Utterance::user(user_text));
        session.push(Utterance::assistant(assistant_text));
    }

    /// Empty the session for `key`. No-op if the key was never seen.
    pub fn clear(&self, key: &ConversationKey) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(key) {
            session.clear();
        }
    }

    /// Number of utterances currently held for `key`.
    pub fn len(&self, key: &ConversationKey) -> usize {
        let sessions = self.sessions.lock();
        sessions.get(key).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of distinct keys seen so far.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn entry<'a>(
        &self,
        sessions: &'a mut HashMap<ConversationKey, RingBuffer<Utterance>>,
        key: &ConversationKey,
    ) -> &'a mut RingBuffer<Utterance> {
        sessions.entry(key.clone()).or_insert_with(|| {
            // Capacity was validated in the constructor.
            RingBuffer::new(self.capacity).unwrap_or_else(|_| unreachable!())
        })
    }
}
