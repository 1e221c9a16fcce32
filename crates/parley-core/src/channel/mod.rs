//! Channel abstraction layer.

pub mod telegram;
pub mod traits;
pub mod types;

pub use telegram::{TelegramChannel, TelegramConfig};
pub use traits::{Channel, StreamReceiver};
pub use types::{ChannelType, InboundMessage, OutboundMessage};
