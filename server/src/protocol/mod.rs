//! 協議模組 - NDJSON 訊息格式

pub mod codec;
pub mod messages;

pub use codec::Codec;
pub use messages::{ClientMessage, GameStateView, ServerMessage};
