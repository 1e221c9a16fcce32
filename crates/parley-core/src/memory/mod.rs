//! Bounded in-memory conversation state.

mod ring;
mod store;

pub use ring::RingBuffer;
pub use store::{ConversationKey, SessionStore, Speaker, Utterance};
