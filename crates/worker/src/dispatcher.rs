use std::sync::Arc;

use {
    courier_broker::Deliveries,
    courier_commands::{
        CommandKind, CommandRegistry, HandlerContext, SERVER_ONLY_FALLBACK,
    },
    courier_protocol::{Envelope, InteractionRecord, decode},
    futures::StreamExt,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

/// What the dispatcher did with one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Chat message accepted; no processing yet.
    MessageAccepted,
    /// A handler ran (successfully or not).
    Handled(CommandKind),
    /// Server-only command from a DM, refused with a reply.
    ServerOnly,
    UnknownCommand,
    /// Malformed, misrouted, or incomplete input.
    Dropped,
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, ctx: HandlerContext) -> Self {
        Self { registry, ctx }
    }

    /// Consume deliveries one at a time until cancelled or the queue closes.
    /// Every delivery is acked after processing, whatever the outcome.
    pub async fn run(&self, mut deliveries: Deliveries, cancel: CancellationToken) {
        info!("worker running");
        loop {
            let delivery = tokio::select! {
                () = cancel.cancelled() => {
                    info!("worker shutting down");
                    return;
                },
                delivery = deliveries.next() => delivery,
            };
            match delivery {
                Some(Ok(delivery)) => {
                    self.handle_payload(delivery.payload()).await;
                    if let Err(e) = delivery.ack().await {
                        warn!(error = %e, "failed to ack delivery");
                    }
                },
                Some(Err(e)) => error!(error = %e, "failed to receive delivery"),
                None => {
                    warn!("inbox queue closed");
                    return;
                },
            }
        }
    }

    pub async fn handle_payload(&self, payload: &[u8]) -> Outcome {
        match decode(payload) {
            Ok(envelope) => self.handle_envelope(envelope).await,
            Err(e) => {
                error!(error = %e, "dropping undecodable envelope");
                Outcome::Dropped
            },
        }
    }

    pub async fn handle_envelope(&self, envelope: Envelope) -> Outcome {
        match envelope {
            Envelope::MessageCreate {
                channel_id,
                messages,
            } => {
                debug!(
                    channel_id = channel_id.as_deref().unwrap_or_default(),
                    messages = messages.len(),
                    "message received"
                );
                Outcome::MessageAccepted
            },
            Envelope::InteractionHandle { interaction } => {
                self.interaction_handle(interaction).await
            },
            other => {
                error!(kind = other.kind(), "envelope is not for the worker, dropping");
                Outcome::Dropped
            },
        }
    }

    async fn interaction_handle(&self, raw: Value) -> Outcome {
        let interaction = match InteractionRecord::from_value(&raw) {
            Ok(interaction) => interaction,
            Err(e) => {
                error!(error = %e, "malformed interaction, dropping");
                return Outcome::Dropped;
            },
        };
        let Some(name) = interaction.command_name().map(str::to_string) else {
            error!(interaction_id = ?interaction.id, "interaction has no command name");
            return Outcome::Dropped;
        };

        let server_only = CommandKind::from_name(&name).is_some_and(CommandKind::is_server_only);
        if interaction.is_dm() && server_only {
            debug!(command = %name, "server-only command used in a DM");
            let text = self
                .ctx
                .text(&interaction, "server_only", SERVER_ONLY_FALLBACK);
            if let Err(e) = self.ctx.reply(&interaction, text).await {
                error!(command = %name, error = %e, "failed to publish reply");
            }
            return Outcome::ServerOnly;
        }

        let Some(kind) = self.registry.resolve(&name) else {
            error!(command = %name, "unknown command");
            return Outcome::UnknownCommand;
        };

        let interaction_id = interaction.id.clone();
        let handler = CommandRegistry::instantiate(kind, self.ctx.clone(), interaction);
        match handler.handle().await {
            Ok(()) => debug!(command = %name, interaction_id = ?interaction_id, "command handled"),
            Err(e) => error!(command = %name, interaction_id = ?interaction_id, error = %e, "command failed"),
        }
        Outcome::Handled(kind)
    }
}
