//! serenity-backed implementations of the gateway traits, and the client
//! that feeds the bridge loop.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde_json::Value,
    serenity::{
        Client,
        all::{
            ChannelId, CommandInteraction, CreateEmbed, EditInteractionResponse, Embed,
            GetMessages,
        },
        http::{Http, HttpError},
    },
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    Error, Result,
    gateway::{Gateway, GatewayEvent, InteractionHandle, InteractionReply},
    handler::CourierHandler,
};

/// Capacity of the gateway → bridge event channel.
pub const EVENT_BUFFER: usize = 256;

fn channel(id: &str) -> Result<ChannelId> {
    id.parse::<u64>()
        .ok()
        .filter(|&n| n != 0)
        .map(ChannelId::new)
        .ok_or_else(|| Error::InvalidId(id.to_string()))
}

fn is_missing(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if matches!(response.status_code.as_u16(), 403 | 404)
    )
}

/// [`Gateway`] over serenity's REST client.
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn fetch_history(&self, channel_id: &str, limit: u8) -> Result<Vec<Value>> {
        let messages = channel(channel_id)?
            .messages(&self.http, GetMessages::new().limit(limit))
            .await
            .map_err(|e| Error::discord("fetch message history", e))?;
        messages
            .iter()
            .map(|m| serde_json::to_value(m).map_err(|e| Error::external("serialize message", e)))
            .collect()
    }

    async fn channel_exists(&self, channel_id: &str) -> Result<bool> {
        let Ok(id) = channel(channel_id) else {
            return Ok(false);
        };
        match self.http.get_channel(id).await {
            Ok(_) => Ok(true),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(Error::discord("get channel", e)),
        }
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        channel(channel_id)?
            .say(&self.http, content)
            .await
            .map_err(|e| Error::discord("send message", e))?;
        Ok(())
    }

    async fn start_typing(&self, channel_id: &str) -> Result<()> {
        channel(channel_id)?
            .broadcast_typing(&self.http)
            .await
            .map_err(|e| Error::discord("start typing", e))
    }
}

/// [`InteractionHandle`] for a slash command interaction.
pub struct SerenityInteraction {
    http: Arc<Http>,
    command: CommandInteraction,
}

impl SerenityInteraction {
    pub fn new(http: Arc<Http>, command: CommandInteraction) -> Self {
        Self { http, command }
    }
}

#[async_trait]
impl InteractionHandle for SerenityInteraction {
    async fn acknowledge(&mut self) -> Result<()> {
        self.command
            .defer_ephemeral(&self.http)
            .await
            .map_err(|e| Error::discord("defer interaction", e))
    }

    async fn finish(self: Box<Self>, reply: InteractionReply) -> Result<()> {
        let embeds: Vec<CreateEmbed> = reply
            .embeds
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Embed>(raw) {
                Ok(embed) => Some(CreateEmbed::from(embed)),
                Err(e) => {
                    warn!(error = %e, "skipping malformed embed");
                    None
                },
            })
            .collect();
        let mut response = EditInteractionResponse::new().content(reply.content);
        if !embeds.is_empty() {
            response = response.embeds(embeds);
        }
        self.command
            .edit_response(&self.http, response)
            .await
            .map_err(|e| Error::discord("edit interaction response", e))?;
        Ok(())
    }
}

/// Options for [`DiscordClient::build`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub activity: Option<String>,
    /// Command manifests to register as global slash commands on ready.
    pub commands: Vec<Value>,
}

/// A serenity client wired to deliver [`GatewayEvent`]s.
pub struct DiscordClient {
    client: Client,
}

impl DiscordClient {
    /// Build the client and the event channel the bridge loop reads from.
    pub async fn build(
        token: &str,
        options: ClientOptions,
    ) -> Result<(Self, mpsc::Receiver<GatewayEvent>)> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handler = CourierHandler::new(tx, options.activity, options.commands);
        let client = Client::builder(token, CourierHandler::intents())
            .event_handler(handler)
            .await
            .map_err(|e| Error::discord("build discord client", e))?;
        Ok((Self { client }, rx))
    }

    pub fn gateway(&self) -> Arc<SerenityGateway> {
        Arc::new(SerenityGateway::new(Arc::clone(&self.client.http)))
    }

    /// Connect and serve until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let shard_manager = Arc::clone(&self.client.shard_manager);
        tokio::select! {
            result = self.client.start() => {
                result.map_err(|e| Error::discord("discord gateway", e))
            },
            () = cancel.cancelled() => {
                info!("disconnecting from discord");
                shard_manager.shutdown_all().await;
                Ok(())
            },
        }
    }
}
