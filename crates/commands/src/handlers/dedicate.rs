use {async_trait::async_trait, courier_protocol::InteractionRecord, tracing::info};

use crate::{
    Result,
    handlers::{CommandHandler, HandlerContext},
    locale::fill,
};

/// `/dedicate [channel:<channel>] [enabled:<bool>]`: set or clear the channel
/// where the bot answers every message. Defaults to the invoking channel.
pub struct Dedicate {
    ctx: HandlerContext,
    interaction: InteractionRecord,
}

impl Dedicate {
    pub fn new(ctx: HandlerContext, interaction: InteractionRecord) -> Self {
        Self { ctx, interaction }
    }
}

#[async_trait]
impl CommandHandler for Dedicate {
    async fn handle(&self) -> Result<()> {
        let Some(guild_id) = self.ctx.require_guild(&self.interaction).await? else {
            return Ok(());
        };
        let enabled = self.interaction.option_bool("enabled").unwrap_or(true);
        let channel = self
            .interaction
            .option_str("channel")
            .or_else(|| self.interaction.channel_id.clone())
            .filter(|_| enabled);

        self.ctx
            .store
            .set_dedicated_channel(guild_id, channel.as_deref())
            .await?;
        info!(guild_id, channel = ?channel, "dedicated channel updated");

        let text = match channel {
            Some(channel_id) => fill(
                &self
                    .ctx
                    .text(&self.interaction, "dedicate_set", "I will answer every message in {channel}."),
                &[("channel", &format!("<#{channel_id}>"))],
            ),
            None => self.ctx.text(
                &self.interaction,
                "dedicate_cleared",
                "Dedicated channel cleared.",
            ),
        };
        self.ctx.reply(&self.interaction, text).await
    }
}
