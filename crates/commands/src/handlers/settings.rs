use {async_trait::async_trait, courier_protocol::InteractionRecord};

use crate::{
    Result,
    handlers::{CommandHandler, HandlerContext},
    locale::fill,
};

/// `/settings`: show the guild's dedicated channel and allowed roles.
pub struct Settings {
    ctx: HandlerContext,
    interaction: InteractionRecord,
}

impl Settings {
    pub fn new(ctx: HandlerContext, interaction: InteractionRecord) -> Self {
        Self { ctx, interaction }
    }

    fn line(&self, key: &str, fallback: &str, vars: &[(&str, &str)]) -> String {
        fill(&self.ctx.text(&self.interaction, key, fallback), vars)
    }
}

#[async_trait]
impl CommandHandler for Settings {
    async fn handle(&self) -> Result<()> {
        let Some(guild_id) = self.ctx.require_guild(&self.interaction).await? else {
            return Ok(());
        };
        let settings = self.ctx.store.get(guild_id).await?;

        let mut lines = vec![self.line("settings_header", "Current settings:", &[])];
        lines.push(match &settings.dedicated_channel_id {
            Some(channel_id) => self.line(
                "settings_dedicated",
                "Dedicated channel: {channel}",
                &[("channel", &format!("<#{channel_id}>"))],
            ),
            None => self.line("settings_no_dedicated", "Dedicated channel: none", &[]),
        });
        if settings.allowed_roles.is_empty() {
            lines.push(self.line("settings_no_roles", "Allowed roles: everyone", &[]));
        } else {
            let roles = settings
                .allowed_roles
                .iter()
                .map(|id| format!("<@&{id}>"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(self.line("settings_roles", "Allowed roles: {roles}", &[(
                "roles", &roles,
            )]));
        }

        self.ctx.reply(&self.interaction, lines.join("\n")).await
    }
}
