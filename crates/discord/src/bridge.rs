//! The bridge event loop.
//!
//! Gateway events become envelopes on the inbox queue; envelopes from the
//! reply queue become Discord calls. Deferred interactions are held in a
//! [`PendingInteractions`] table owned by the loop until a worker answers or
//! the entry expires.
//!
//! Outbound Discord calls run on spawned tasks so a slow send never delays
//! interaction acknowledges. Sends to one channel are chained: each waits for
//! the previous send to that channel to finish.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    courier_broker::{Deliveries, Publisher},
    courier_config::{DiscordConfig, DmPolicy},
    courier_protocol::{Envelope, decode},
    futures::StreamExt,
    serde_json::Value,
    tokio::{
        sync::{mpsc, oneshot},
        task::{JoinError, JoinSet},
        time::MissedTickBehavior,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    gateway::{
        Gateway, GatewayEvent, InboundInteraction, InboundMessage, InteractionHandle,
        InteractionReply,
    },
    pending::PendingInteractions,
    split::split,
};

/// Sent when a deferred interaction could not be handed to a worker.
pub const FAILURE_REPLY: &str = "Something went wrong, please try again.";
/// Sent when no worker answered before the interaction expired.
pub const TIMEOUT_REPLY: &str = "This request timed out, please try again.";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub dm_policy: DmPolicy,
    pub history_limit: u8,
    pub pending_ttl: Duration,
    pub sweep_interval: Duration,
}

impl From<&DiscordConfig> for BridgeConfig {
    fn from(config: &DiscordConfig) -> Self {
        Self {
            dm_policy: config.dm_policy,
            history_limit: config.history_limit,
            pending_ttl: Duration::from_secs(config.pending_ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&DiscordConfig::default())
    }
}

/// Completion signal of the latest send queued for a channel.
struct ChannelTail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

pub struct Bridge {
    config: BridgeConfig,
    gateway: Arc<dyn Gateway>,
    /// Publishes to the inbox queue.
    inbox: Publisher,
    pending: PendingInteractions,
    bot_user_id: Option<String>,
    /// History forwards and typing indicators.
    tasks: JoinSet<()>,
    /// Message sends; each yields its channel and sequence number.
    sends: JoinSet<(String, u64)>,
    tails: HashMap<String, ChannelTail>,
    next_seq: u64,
}

impl Bridge {
    pub fn new(config: BridgeConfig, gateway: Arc<dyn Gateway>, inbox: Publisher) -> Self {
        let pending = PendingInteractions::new(config.pending_ttl);
        Self {
            config,
            gateway,
            inbox,
            pending,
            bot_user_id: None,
            tasks: JoinSet::new(),
            sends: JoinSet::new(),
            tails: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn pending(&self) -> &PendingInteractions {
        &self.pending
    }

    /// Serve until cancelled or until either input closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<GatewayEvent>,
        mut deliveries: Deliveries,
        cancel: CancellationToken,
    ) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(inbox = %self.inbox.queue(), "bridge running");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("bridge shutting down");
                    break;
                },
                event = events.recv() => match event {
                    Some(event) => self.handle_gateway_event(event).await,
                    None => {
                        warn!("gateway event channel closed");
                        break;
                    },
                },
                delivery = deliveries.next() => match delivery {
                    Some(Ok(delivery)) => {
                        self.handle_delivery(delivery.payload()).await;
                        if let Err(e) = delivery.ack().await {
                            warn!(error = %e, "failed to ack delivery");
                        }
                    },
                    Some(Err(e)) => error!(error = %e, "failed to receive delivery"),
                    None => {
                        warn!("reply queue closed");
                        break;
                    },
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "outbound task failed");
                    }
                },
                Some(joined) = self.sends.join_next(), if !self.sends.is_empty() => {
                    self.send_finished(joined);
                },
                _ = sweep.tick() => self.sweep(Instant::now()).await,
            }
        }

        if !self.pending.is_empty() {
            warn!(
                count = self.pending.len(),
                "dropping pending interactions on shutdown"
            );
        }
        self.tasks.shutdown().await;
        self.sends.shutdown().await;
    }

    pub async fn handle_gateway_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { bot_user_id } => {
                info!(bot_user_id = %bot_user_id, "gateway ready");
                self.bot_user_id = Some(bot_user_id);
            },
            GatewayEvent::Message(message) => self.on_message(message),
            GatewayEvent::Interaction(interaction) => self.on_interaction(interaction).await,
        }
    }

    /// Whether a chat message should be forwarded to the workers.
    ///
    /// Only the bot's own messages are excluded by author; messages from
    /// other bots trigger like anyone else's.
    pub fn should_forward(&self, message: &InboundMessage) -> bool {
        let Some(bot_id) = self.bot_user_id.as_deref() else {
            return false;
        };
        if message.author_id == bot_id {
            return false;
        }
        if message.is_dm {
            return self.config.dm_policy == DmPolicy::Open;
        }
        message.mentions.iter().any(|id| id == bot_id)
            || message.referenced_author_id.as_deref() == Some(bot_id)
    }

    fn on_message(&mut self, message: InboundMessage) {
        if !self.should_forward(&message) {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let inbox = self.inbox.clone();
        let limit = self.config.history_limit;
        let channel_id = message.channel_id;
        if message.author_is_bot {
            debug!(
                channel_id = %channel_id,
                author_id = %message.author_id,
                "forwarding message from another bot"
            );
        }
        self.tasks.spawn(async move {
            let messages = match gateway.fetch_history(&channel_id, limit).await {
                Ok(messages) => messages,
                Err(e) => {
                    error!(channel_id = %channel_id, error = %e, "failed to fetch message history");
                    return;
                },
            };
            let count = messages.len();
            let envelope = Envelope::MessageCreate {
                channel_id: Some(channel_id.clone()),
                messages,
            };
            match inbox.publish(&envelope).await {
                Ok(()) => debug!(channel_id = %channel_id, count, "forwarded message"),
                Err(e) => error!(channel_id = %channel_id, error = %e, "failed to publish message"),
            }
        });
    }

    async fn on_interaction(&mut self, interaction: InboundInteraction) {
        let InboundInteraction {
            id,
            payload,
            mut handle,
        } = interaction;

        if let Err(e) = handle.acknowledge().await {
            error!(interaction_id = %id, error = %e, "failed to acknowledge interaction");
            return;
        }
        if self
            .pending
            .insert(id.clone(), handle, Instant::now())
            .is_some()
        {
            warn!(interaction_id = %id, "replaced pending interaction with the same id");
        }

        let envelope = Envelope::InteractionHandle {
            interaction: payload,
        };
        if let Err(e) = self.inbox.publish(&envelope).await {
            error!(interaction_id = %id, error = %e, "failed to publish interaction");
            if let Some(handle) = self.pending.take(&id) {
                finish(&id, handle, InteractionReply::text(FAILURE_REPLY)).await;
            }
            return;
        }
        debug!(interaction_id = %id, "forwarded interaction");
    }

    /// Process one reply-queue payload. Undecodable payloads are logged and
    /// dropped.
    pub async fn handle_delivery(&mut self, payload: &[u8]) {
        match decode(payload) {
            Ok(envelope) => self.handle_envelope(envelope).await,
            Err(e) => error!(error = %e, "dropping undecodable envelope"),
        }
    }

    pub async fn handle_envelope(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::SendMessage {
                channel_id,
                content,
            } => self.queue_send(channel_id, content),
            Envelope::StartTyping { channel_id } => self.queue_typing(channel_id),
            Envelope::InteractionReply {
                interaction_id,
                content,
                embeds,
            } => self.interaction_reply(interaction_id, content, embeds).await,
            other @ (Envelope::MessageCreate { .. } | Envelope::InteractionHandle { .. }) => {
                warn!(kind = other.kind(), "envelope is not for the bridge, dropping");
            },
        }
    }

    /// Spawn a send behind any earlier send to the same channel.
    fn queue_send(&mut self, channel_id: Option<String>, content: Option<String>) {
        let Some(channel_id) = channel_id.filter(|id| !id.is_empty()) else {
            error!(op = "send_message", "envelope has no channel id");
            return;
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        let (done_tx, done) = oneshot::channel();
        let previous = self.tails.insert(channel_id.clone(), ChannelTail { seq, done });

        let gateway = Arc::clone(&self.gateway);
        self.sends.spawn(async move {
            if let Some(previous) = previous {
                // Err means the previous task is gone, which also ends the wait.
                previous.done.await.ok();
            }
            send_message(gateway.as_ref(), &channel_id, content.as_deref()).await;
            done_tx.send(()).ok();
            (channel_id, seq)
        });
    }

    fn queue_typing(&mut self, channel_id: Option<String>) {
        let Some(channel_id) = channel_id.filter(|id| !id.is_empty()) else {
            error!(op = "start_typing", "envelope has no channel id");
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        self.tasks.spawn(async move {
            start_typing(gateway.as_ref(), &channel_id).await;
        });
    }

    /// Forget the channel's tail once its latest send is done.
    fn send_finished(&mut self, joined: Result<(String, u64), JoinError>) {
        match joined {
            Ok((channel_id, seq)) => {
                if self.tails.get(&channel_id).is_some_and(|tail| tail.seq == seq) {
                    self.tails.remove(&channel_id);
                }
            },
            Err(e) => error!(error = %e, "message send task failed"),
        }
    }

    async fn interaction_reply(
        &mut self,
        interaction_id: Option<String>,
        content: Option<String>,
        embeds: Vec<Value>,
    ) {
        let (Some(id), Some(content)) = (
            interaction_id.filter(|id| !id.is_empty()),
            content.filter(|c| !c.is_empty()),
        ) else {
            warn!("interaction reply without id or content, dropping");
            return;
        };
        let Some(handle) = self.pending.take(&id) else {
            warn!(interaction_id = %id, "no pending interaction for reply");
            return;
        };

        let embeds = embeds
            .into_iter()
            .filter(|embed| embed.get("type").and_then(Value::as_str) == Some("rich"))
            .collect();
        finish(&id, handle, InteractionReply { content, embeds }).await;
    }

    /// Answer and drop every pending interaction older than the TTL.
    pub async fn sweep(&mut self, now: Instant) {
        let expired = self.pending.take_expired(now);
        if expired.is_empty() {
            return;
        }
        info!(count = expired.len(), "expiring pending interactions");
        for (id, handle) in expired {
            finish(&id, handle, InteractionReply::text(TIMEOUT_REPLY)).await;
        }
    }

    /// Wait for every in-flight outbound task.
    pub async fn flush(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "outbound task failed");
            }
        }
        while let Some(joined) = self.sends.join_next().await {
            self.send_finished(joined);
        }
    }
}

/// Whether the channel exists, logging why it is unusable.
async fn channel_usable(gateway: &dyn Gateway, channel_id: &str, op: &str) -> bool {
    match gateway.channel_exists(channel_id).await {
        Ok(true) => true,
        Ok(false) => {
            error!(op, channel_id = %channel_id, "channel not found");
            false
        },
        Err(e) => {
            error!(op, channel_id = %channel_id, error = %e, "failed to resolve channel");
            false
        },
    }
}

/// Send `content` as ordered chunks, each awaited before the next.
async fn send_message(gateway: &dyn Gateway, channel_id: &str, content: Option<&str>) {
    if !channel_usable(gateway, channel_id, "send_message").await {
        return;
    }
    let chunks = split(content.unwrap_or_default());
    if chunks.is_empty() {
        debug!(channel_id = %channel_id, "nothing to send");
        return;
    }

    let total = chunks.len();
    for (index, chunk) in chunks.iter().enumerate() {
        if let Err(e) = gateway.send_message(channel_id, chunk).await {
            error!(
                channel_id = %channel_id,
                chunk = index + 1,
                total,
                error = %e,
                "failed to send message, dropping remaining chunks"
            );
            return;
        }
    }
    debug!(channel_id = %channel_id, chunks = total, "message sent");
}

async fn start_typing(gateway: &dyn Gateway, channel_id: &str) {
    if !channel_usable(gateway, channel_id, "start_typing").await {
        return;
    }
    if let Err(e) = gateway.start_typing(channel_id).await {
        warn!(channel_id = %channel_id, error = %e, "failed to start typing");
    }
}

async fn finish(id: &str, handle: Box<dyn InteractionHandle>, reply: InteractionReply) {
    match handle.finish(reply).await {
        Ok(()) => debug!(interaction_id = %id, "interaction finished"),
        Err(e) => error!(interaction_id = %id, error = %e, "failed to finish interaction"),
    }
}
