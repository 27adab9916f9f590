//! The seam between the bridge loop and the Discord client.
//!
//! The serenity adapter implements these traits; tests use in-memory fakes.

use {async_trait::async_trait, serde_json::Value};

use crate::Result;

/// Channel operations the bridge needs from Discord.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The most recent `limit` messages of a channel, newest first, as raw
    /// Discord message objects.
    async fn fetch_history(&self, channel_id: &str, limit: u8) -> Result<Vec<Value>>;

    /// Whether the channel exists and is visible to the bot.
    async fn channel_exists(&self, channel_id: &str) -> Result<bool>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()>;

    async fn start_typing(&self, channel_id: &str) -> Result<()>;
}

/// A live interaction awaiting its deferred response.
#[async_trait]
pub trait InteractionHandle: Send + Sync {
    /// Defer with an ephemeral "thinking" response.
    async fn acknowledge(&mut self) -> Result<()>;

    /// Replace the deferred response. Consumes the handle: an interaction is
    /// finished at most once.
    async fn finish(self: Box<Self>, reply: InteractionReply) -> Result<()>;
}

/// Final content of a deferred interaction response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionReply {
    pub content: String,
    /// Rich embed objects.
    pub embeds: Vec<Value>,
}

impl InteractionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
        }
    }
}

/// A chat message as seen by the trigger filter.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub channel_id: String,
    pub author_id: String,
    /// Set for bot accounts other than ours; they trigger like anyone else.
    pub author_is_bot: bool,
    pub is_dm: bool,
    /// Ids of mentioned users.
    pub mentions: Vec<String>,
    /// Author of the message this one replies to.
    pub referenced_author_id: Option<String>,
}

/// A slash command invocation.
pub struct InboundInteraction {
    pub id: String,
    /// The full interaction object, forwarded verbatim.
    pub payload: Value,
    pub handle: Box<dyn InteractionHandle>,
}

impl std::fmt::Debug for InboundInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundInteraction")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Events forwarded from the Discord client to the bridge loop.
#[derive(Debug)]
pub enum GatewayEvent {
    Ready { bot_user_id: String },
    Message(InboundMessage),
    Interaction(InboundInteraction),
}
