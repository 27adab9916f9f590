use {async_trait::async_trait, courier_protocol::InteractionRecord, tracing::info};

use crate::{
    Result,
    handlers::{CommandHandler, HandlerContext},
    locale::fill,
};

/// `/allow role:<role> [enabled:<bool>]`: add or remove a role from the
/// guild's allowlist.
pub struct Allow {
    ctx: HandlerContext,
    interaction: InteractionRecord,
}

impl Allow {
    pub fn new(ctx: HandlerContext, interaction: InteractionRecord) -> Self {
        Self { ctx, interaction }
    }
}

#[async_trait]
impl CommandHandler for Allow {
    async fn handle(&self) -> Result<()> {
        let Some(guild_id) = self.ctx.require_guild(&self.interaction).await? else {
            return Ok(());
        };
        let Some(role_id) = self.interaction.option_str("role") else {
            let text = self
                .ctx
                .text(&self.interaction, "allow_missing_role", "Please choose a role.");
            return self.ctx.reply(&self.interaction, text).await;
        };
        let enabled = self.interaction.option_bool("enabled").unwrap_or(true);

        self.ctx
            .store
            .set_role_allowed(guild_id, &role_id, enabled)
            .await?;
        info!(guild_id, role_id = %role_id, enabled, "role allowlist updated");

        let (key, fallback) = if enabled {
            ("allow_added", "{role} can now use the bot.")
        } else {
            ("allow_removed", "{role} can no longer use the bot.")
        };
        let mention = format!("<@&{role_id}>");
        let text = fill(
            &self.ctx.text(&self.interaction, key, fallback),
            &[("role", &mention)],
        );
        self.ctx.reply(&self.interaction, text).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::handlers::testing::{Harness, interaction},
        serde_json::json,
    };

    #[tokio::test]
    async fn adds_then_removes_role() {
        let harness = Harness::new().await;
        let add = interaction("allow", Some("1"), json!([{"name": "role", "type": 8, "value": "55"}]));
        Allow::new(harness.ctx.clone(), add).handle().await.unwrap();
        assert_eq!(
            harness.ctx.store.get("1").await.unwrap().allowed_roles,
            vec!["55"]
        );
        assert_eq!(harness.replies()[0].1, "<@&55> may use the bot.");

        let remove = interaction(
            "allow",
            Some("1"),
            json!([
                {"name": "role", "type": 8, "value": "55"},
                {"name": "enabled", "type": 5, "value": false}
            ]),
        );
        Allow::new(harness.ctx.clone(), remove).handle().await.unwrap();
        assert!(harness.ctx.store.get("1").await.unwrap().allowed_roles.is_empty());
        assert_eq!(harness.replies()[0].1, "<@&55> may no longer use the bot.");
    }

    #[tokio::test]
    async fn replayed_command_is_idempotent() {
        let harness = Harness::new().await;
        let add = interaction("allow", Some("1"), json!([{"name": "role", "value": 55}]));
        for _ in 0..2 {
            Allow::new(harness.ctx.clone(), add.clone())
                .handle()
                .await
                .unwrap();
        }
        assert_eq!(
            harness.ctx.store.get("1").await.unwrap().allowed_roles,
            vec!["55"]
        );
        assert_eq!(harness.replies().len(), 2);
    }

    #[tokio::test]
    async fn missing_role_is_reported() {
        let harness = Harness::new().await;
        Allow::new(harness.ctx.clone(), interaction("allow", Some("1"), json!([])))
            .handle()
            .await
            .unwrap();
        assert_eq!(harness.replies()[0].1, "Pick a role.");
    }

    #[tokio::test]
    async fn refuses_without_guild() {
        let harness = Harness::new().await;
        let dm = interaction("allow", None, json!([{"name": "role", "value": "55"}]));
        Allow::new(harness.ctx.clone(), dm).handle().await.unwrap();
        assert_eq!(harness.replies()[0].1, "Servers only.");
    }
}
