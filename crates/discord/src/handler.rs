//! Discord event handler for serenity.
//!
//! Translates gateway events into [`GatewayEvent`]s for the bridge loop. No
//! decisions are made here beyond dropping event kinds the bridge ignores;
//! the trigger filter, including the self-author check, lives in the bridge.

use std::sync::atomic::{AtomicBool, Ordering};

use {
    serde_json::Value,
    serenity::{
        all::{ActivityData, Context, EventHandler, GatewayIntents, Interaction, Message, Ready},
        async_trait,
    },
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{
    client::SerenityInteraction,
    gateway::{GatewayEvent, InboundInteraction, InboundMessage},
    register::register_all,
};

/// Handler for Discord gateway events.
pub struct CourierHandler {
    events: mpsc::Sender<GatewayEvent>,
    activity: Option<String>,
    /// Command manifests registered on the first ready.
    commands: Vec<Value>,
    registered: AtomicBool,
}

impl CourierHandler {
    pub fn new(
        events: mpsc::Sender<GatewayEvent>,
        activity: Option<String>,
        commands: Vec<Value>,
    ) -> Self {
        Self {
            events,
            activity,
            commands,
            registered: AtomicBool::new(false),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn forward(&self, event: GatewayEvent) {
        if self.events.send(event).await.is_err() {
            warn!("bridge loop is gone, dropping gateway event");
        }
    }
}

fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        channel_id: msg.channel_id.to_string(),
        author_id: msg.author.id.to_string(),
        author_is_bot: msg.author.bot,
        is_dm: msg.guild_id.is_none(),
        mentions: msg.mentions.iter().map(|u| u.id.to_string()).collect(),
        referenced_author_id: msg
            .referenced_message
            .as_ref()
            .map(|m| m.author.id.to_string()),
    }
}

#[async_trait]
impl EventHandler for CourierHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        if let Some(activity) = &self.activity {
            ctx.set_activity(Some(ActivityData::playing(activity.as_str())));
        }

        if !self.commands.is_empty() && !self.registered.swap(true, Ordering::SeqCst) {
            register_all(&*ctx.http, &self.commands).await;
        }

        self.forward(GatewayEvent::Ready {
            bot_user_id: ready.user.id.to_string(),
        })
        .await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.forward(GatewayEvent::Message(inbound_message(&msg)))
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            debug!("ignoring non-command interaction");
            return;
        };
        let payload = match serde_json::to_value(&command) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(interaction_id = %command.id, error = %e, "cannot serialize interaction");
                return;
            },
        };
        self.forward(GatewayEvent::Interaction(InboundInteraction {
            id: command.id.to_string(),
            payload,
            handle: Box::new(SerenityInteraction::new(ctx.http.clone(), command)),
        }))
        .await;
    }
}
