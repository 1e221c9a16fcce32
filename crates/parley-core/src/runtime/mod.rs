//! Message processing runtime.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{ChatDispatcher, ChatDispatcherConfig, ChatError};
pub use handler::start_message_handler;
