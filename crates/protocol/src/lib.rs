//! Broker envelope protocol shared by the Discord bridge and the workers.
//!
//! Every broker message is a flat JSON object tagged by `type`:
//! - `message_create`, `interaction_handle`: bridge → worker (`inbox` queue)
//! - `send_message`, `start_typing`, `interaction_reply`: worker → bridge

pub mod envelope;
pub mod interaction;
mod snowflake;

pub use {
    envelope::{DecodeError, Envelope, decode, encode},
    interaction::{InteractionData, InteractionOption, InteractionRecord},
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Queue consumed by workers.
pub const INBOX_QUEUE: &str = "inbox";
/// Default queue consumed by the bridge (replies from workers).
pub const REPLY_QUEUE: &str = "discord";
/// Discord's hard limit on message content length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Number of recent channel messages forwarded with a `message_create`.
pub const HISTORY_LIMIT: u8 = 100;
