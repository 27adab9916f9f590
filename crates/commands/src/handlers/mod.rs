//! Slash command handlers.
//!
//! A handler is built per interaction and replies by publishing an
//! `interaction_reply` envelope; the bridge finishes the deferred response.

mod allow;
mod dedicate;
mod help;
mod settings;

use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_broker::Publisher,
    courier_protocol::{Envelope, InteractionRecord},
    courier_storage::GuildSettingsStore,
};

use crate::{Result, locale::LocaleBundle};

pub use {allow::Allow, dedicate::Dedicate, help::Help, settings::Settings};

/// Fallback when neither the user's nor the default locale has `server_only`.
pub const SERVER_ONLY_FALLBACK: &str = "This command is only available in servers.";

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self) -> Result<()>;
}

/// Shared collaborators handed to every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn GuildSettingsStore>,
    pub locales: Arc<LocaleBundle>,
    pub publisher: Publisher,
}

impl HandlerContext {
    pub fn new(
        store: Arc<dyn GuildSettingsStore>,
        locales: Arc<LocaleBundle>,
        publisher: Publisher,
    ) -> Self {
        Self {
            store,
            locales,
            publisher,
        }
    }

    /// Localized text in the invoking user's locale.
    pub fn text(&self, interaction: &InteractionRecord, key: &str, fallback: &str) -> String {
        self.locales
            .text(interaction.locale.as_deref(), key, fallback)
    }

    pub async fn reply(&self, interaction: &InteractionRecord, content: String) -> Result<()> {
        self.publisher
            .publish(&Envelope::interaction_reply(
                interaction.id.clone(),
                content,
            ))
            .await?;
        Ok(())
    }

    /// The interaction's guild, or a `server_only` reply when there is none.
    pub(crate) async fn require_guild<'a>(
        &self,
        interaction: &'a InteractionRecord,
    ) -> Result<Option<&'a str>> {
        match interaction.guild_id.as_deref().filter(|g| !g.is_empty()) {
            Some(guild_id) => Ok(Some(guild_id)),
            None => {
                let text = self.text(interaction, "server_only", SERVER_ONLY_FALLBACK);
                self.reply(interaction, text).await?;
                Ok(None)
            },
        }
    }
}
