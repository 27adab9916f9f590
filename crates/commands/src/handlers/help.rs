use {async_trait::async_trait, courier_protocol::InteractionRecord};

use crate::{
    Result,
    handlers::{CommandHandler, HandlerContext},
};

/// `/help`: a single localized help text.
pub struct Help {
    ctx: HandlerContext,
    interaction: InteractionRecord,
}

impl Help {
    pub fn new(ctx: HandlerContext, interaction: InteractionRecord) -> Self {
        Self { ctx, interaction }
    }
}

#[async_trait]
impl CommandHandler for Help {
    async fn handle(&self) -> Result<()> {
        let text = self
            .ctx
            .text(&self.interaction, "help_text", "No help available");
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
    async fn replies_with_help_text() {
        let harness = Harness::new().await;
        Help::new(harness.ctx.clone(), interaction("help", None, json!([])))
            .handle()
            .await
            .unwrap();
        assert_eq!(harness.replies(), vec![(
            Some("900".to_string()),
            "Mention me to chat.".to_string()
        )]);
    }

    #[tokio::test]
    async fn falls_back_to_literal_without_locales() {
        let mut harness = Harness::new().await;
        harness.ctx.locales = std::sync::Arc::new(crate::LocaleBundle::new("en-US"));
        Help::new(harness.ctx.clone(), interaction("help", Some("1"), json!([])))
            .handle()
            .await
            .unwrap();
        assert_eq!(harness.replies()[0].1, "No help available");
    }
}
