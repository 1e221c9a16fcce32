//! Core runtime for Parley: a Telegram relay that answers with an LLM
//! backend while mimicking one configured sender's writing style.
//!
//! The pipeline per message: admission gate, style accumulation, prompt
//! assembly from bounded session history, backend call, paired history
//! append, reply. Everything is in-memory; nothing survives a restart.

pub mod channel;
pub mod config;
pub mod gate;
pub mod memory;
pub mod prompt;
pub mod runtime;
pub mod style;

pub use config::{ConfigError, Settings};
pub use gate::AdmissionGate;
pub use memory::{ConversationKey, SessionStore};
pub use prompt::PromptAssembler;
pub use style::StyleAccumulator;
