#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    courier_broker::{Broker, Deliveries, MemoryBroker, Publisher},
    courier_config::DmPolicy,
    courier_discord::{
        Bridge, BridgeConfig, Error, FAILURE_REPLY, Gateway, GatewayEvent, InboundInteraction,
        InboundMessage, InteractionHandle, InteractionReply, Result, TIMEOUT_REPLY,
    },
    courier_protocol::{Envelope, decode, encode},
    rstest::rstest,
    serde_json::{Value, json},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
};

const BOT: &str = "1000";

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeGateway {
    channels: Vec<String>,
    history: Vec<Value>,
    fail_history: bool,
    /// Sends fail once this many chunks went through.
    fail_send_after: Option<usize>,
    /// How long each chunk send takes.
    send_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
    typing: Mutex<Vec<String>>,
}

impl FakeGateway {
    fn with_channel(channel_id: &str) -> Self {
        Self {
            channels: vec![channel_id.to_string()],
            ..Default::default()
        }
    }

    fn slow(channels: &[&str], send_delay: Duration) -> Self {
        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            send_delay,
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn fetch_history(&self, channel_id: &str, limit: u8) -> Result<Vec<Value>> {
        if self.fail_history {
            return Err(Error::InvalidId(channel_id.to_string()));
        }
        Ok(self.history.iter().take(limit.into()).cloned().collect())
    }

    async fn channel_exists(&self, channel_id: &str) -> Result<bool> {
        Ok(self.channels.iter().any(|c| c == channel_id))
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        let result = {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_send_after.is_some_and(|n| sent.len() >= n) {
                Err(Error::InvalidId(channel_id.to_string()))
            } else {
                sent.push((channel_id.to_string(), content.to_string()));
                Ok(())
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn start_typing(&self, channel_id: &str) -> Result<()> {
        self.typing.lock().unwrap().push(channel_id.to_string());
        Ok(())
    }
}

type Finished = Arc<Mutex<Vec<(String, InteractionReply)>>>;

struct FakeHandle {
    id: String,
    fail_ack: bool,
    acked: Arc<Mutex<Vec<String>>>,
    finished: Finished,
}

#[async_trait]
impl InteractionHandle for FakeHandle {
    async fn acknowledge(&mut self) -> Result<()> {
        if self.fail_ack {
            return Err(Error::InvalidId(self.id.clone()));
        }
        self.acked.lock().unwrap().push(self.id.clone());
        Ok(())
    }

    async fn finish(self: Box<Self>, reply: InteractionReply) -> Result<()> {
        self.finished.lock().unwrap().push((self.id.clone(), reply));
        Ok(())
    }
}

/// Rejects every publish.
struct DownBroker;

#[async_trait]
impl Broker for DownBroker {
    async fn declare(&self, _queue: &str) -> courier_broker::Result<()> {
        Ok(())
    }

    async fn publish(&self, queue: &str, _payload: Bytes) -> courier_broker::Result<()> {
        Err(courier_broker::Error::Closed {
            queue: queue.to_string(),
        })
    }

    async fn consume(&self, queue: &str) -> courier_broker::Result<Deliveries> {
        Err(courier_broker::Error::Closed {
            queue: queue.to_string(),
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    bridge: Bridge,
    gateway: Arc<FakeGateway>,
    broker: MemoryBroker,
    acked: Arc<Mutex<Vec<String>>>,
    finished: Finished,
}

impl Harness {
    async fn new(gateway: FakeGateway, config: BridgeConfig) -> Self {
        let broker = MemoryBroker::new();
        let gateway = Arc::new(gateway);
        let mut bridge = Bridge::new(
            config,
            gateway.clone(),
            Publisher::new(Arc::new(broker.clone()), "inbox"),
        );
        bridge
            .handle_gateway_event(GatewayEvent::Ready {
                bot_user_id: BOT.into(),
            })
            .await;
        Self {
            bridge,
            gateway,
            broker,
            acked: Arc::default(),
            finished: Arc::default(),
        }
    }

    async fn ready() -> Self {
        Self::new(FakeGateway::with_channel("500"), BridgeConfig::default()).await
    }

    fn interaction(&self, id: &str, fail_ack: bool) -> GatewayEvent {
        GatewayEvent::Interaction(InboundInteraction {
            id: id.to_string(),
            payload: json!({"id": id, "data": {"name": "help"}, "guild_id": "1"}),
            handle: Box::new(FakeHandle {
                id: id.to_string(),
                fail_ack,
                acked: self.acked.clone(),
                finished: self.finished.clone(),
            }),
        })
    }

    fn inbox(&self) -> Vec<Envelope> {
        self.broker
            .drain("inbox")
            .iter()
            .map(|b| decode(b).unwrap())
            .collect()
    }

    fn finished(&self) -> Vec<(String, InteractionReply)> {
        self.finished.lock().unwrap().clone()
    }

    /// Deliver one reply-queue envelope and wait for the work it spawned.
    async fn deliver(&mut self, envelope: Value) {
        self.bridge
            .handle_delivery(envelope.to_string().as_bytes())
            .await;
        self.bridge.flush().await;
    }
}

fn message(author: &str) -> InboundMessage {
    InboundMessage {
        channel_id: "500".into(),
        author_id: author.into(),
        ..Default::default()
    }
}

// ── Interactions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn interaction_round_trip() {
    let mut h = Harness::ready().await;
    let event = h.interaction("42", false);
    h.bridge.handle_gateway_event(event).await;

    assert_eq!(*h.acked.lock().unwrap(), ["42"]);
    assert!(h.bridge.pending().contains("42"));
    match h.inbox().as_slice() {
        [Envelope::InteractionHandle { interaction }] => {
            assert_eq!(interaction["data"]["name"], "help");
        },
        other => panic!("unexpected inbox: {other:?}"),
    }

    h.deliver(json!({
        "type": "interaction_reply",
        "interaction_id": 42,
        "content": "done",
        "embeds": [{"type": "rich", "title": "kept"}, {"type": "video", "url": "x"}]
    }))
    .await;

    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].0, "42");
    assert_eq!(finished[0].1.content, "done");
    assert_eq!(finished[0].1.embeds, vec![json!({"type": "rich", "title": "kept"})]);
    assert!(h.bridge.pending().is_empty());
}

#[tokio::test]
async fn reply_for_unknown_or_consumed_id_is_ignored() {
    let mut h = Harness::ready().await;
    let reply = json!({"type": "interaction_reply", "interaction_id": "42", "content": "hi"});

    h.deliver(reply.clone()).await;
    assert!(h.finished().is_empty());

    let event = h.interaction("42", false);
    h.bridge.handle_gateway_event(event).await;
    h.deliver(reply.clone()).await;
    h.deliver(reply).await;
    assert_eq!(h.finished().len(), 1);
}

#[rstest]
#[case::no_content(json!({"type": "interaction_reply", "interaction_id": "42"}))]
#[case::empty_content(json!({"type": "interaction_reply", "interaction_id": "42", "content": ""}))]
#[case::no_id(json!({"type": "interaction_reply", "content": "hi"}))]
#[tokio::test]
async fn incomplete_reply_keeps_entry(#[case] reply: Value) {
    let mut h = Harness::ready().await;
    let event = h.interaction("42", false);
    h.bridge.handle_gateway_event(event).await;

    h.deliver(reply).await;
    assert!(h.finished().is_empty());
    assert!(h.bridge.pending().contains("42"));
}

#[tokio::test]
async fn failed_acknowledge_drops_interaction() {
    let mut h = Harness::ready().await;
    let event = h.interaction("42", true);
    h.bridge.handle_gateway_event(event).await;

    assert!(h.bridge.pending().is_empty());
    assert!(h.inbox().is_empty());
    assert!(h.finished().is_empty());
}

#[tokio::test]
async fn failed_publish_finishes_with_failure_reply() {
    let finished: Finished = Arc::default();
    let mut bridge = Bridge::new(
        BridgeConfig::default(),
        Arc::new(FakeGateway::default()),
        Publisher::new(Arc::new(DownBroker), "inbox"),
    );
    bridge
        .handle_gateway_event(GatewayEvent::Interaction(InboundInteraction {
            id: "42".into(),
            payload: json!({"id": "42"}),
            handle: Box::new(FakeHandle {
                id: "42".into(),
                fail_ack: false,
                acked: Arc::default(),
                finished: finished.clone(),
            }),
        }))
        .await;

    assert!(bridge.pending().is_empty());
    let finished = finished.lock().unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].1.content, FAILURE_REPLY);
}

#[tokio::test]
async fn sweep_expires_old_interactions() {
    let config = BridgeConfig {
        pending_ttl: Duration::from_secs(60),
        ..BridgeConfig::default()
    };
    let mut h = Harness::new(FakeGateway::default(), config).await;
    let event = h.interaction("42", false);
    h.bridge.handle_gateway_event(event).await;

    h.bridge.sweep(Instant::now()).await;
    assert!(h.bridge.pending().contains("42"));

    h.bridge
        .sweep(Instant::now() + Duration::from_secs(61))
        .await;
    assert!(h.bridge.pending().is_empty());
    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].1.content, TIMEOUT_REPLY);
}

// ── Chat messages ────────────────────────────────────────────────────────────

#[rstest]
#[case::mention(InboundMessage { mentions: vec![BOT.into()], ..message("7") }, true)]
#[case::reply_to_bot(InboundMessage { referenced_author_id: Some(BOT.into()), ..message("7") }, true)]
#[case::reply_to_other(InboundMessage { referenced_author_id: Some("8".into()), ..message("7") }, false)]
#[case::plain(message("7"), false)]
#[case::other_mention(InboundMessage { mentions: vec!["8".into()], ..message("7") }, false)]
#[case::own_message(InboundMessage { mentions: vec![BOT.into()], ..message(BOT) }, false)]
#[case::other_bot_mention(InboundMessage { author_is_bot: true, mentions: vec![BOT.into()], ..message("9") }, true)]
#[case::other_bot_reply(InboundMessage { author_is_bot: true, referenced_author_id: Some(BOT.into()), ..message("9") }, true)]
#[case::other_bot_plain(InboundMessage { author_is_bot: true, ..message("9") }, false)]
#[case::dm(InboundMessage { is_dm: true, ..message("7") }, false)]
#[case::dm_with_mention(InboundMessage { is_dm: true, mentions: vec![BOT.into()], ..message("7") }, false)]
#[tokio::test]
async fn trigger_filter(#[case] msg: InboundMessage, #[case] forwarded: bool) {
    let h = Harness::ready().await;
    assert_eq!(h.bridge.should_forward(&msg), forwarded);
}

#[tokio::test]
async fn open_dm_policy_forwards_every_dm() {
    let config = BridgeConfig {
        dm_policy: DmPolicy::Open,
        ..BridgeConfig::default()
    };
    let h = Harness::new(FakeGateway::default(), config).await;
    let dm = InboundMessage {
        is_dm: true,
        ..message("7")
    };
    assert!(h.bridge.should_forward(&dm));
    assert!(!h.bridge.should_forward(&InboundMessage {
        is_dm: true,
        ..message(BOT)
    }));
}

#[tokio::test]
async fn nothing_forwarded_before_ready() {
    let bridge = Bridge::new(
        BridgeConfig::default(),
        Arc::new(FakeGateway::default()),
        Publisher::new(Arc::new(MemoryBroker::new()), "inbox"),
    );
    let msg = InboundMessage {
        mentions: vec![BOT.into()],
        ..message("7")
    };
    assert!(!bridge.should_forward(&msg));
}

#[tokio::test]
async fn mention_publishes_history() {
    let gateway = FakeGateway {
        history: (0..150).map(|i| json!({"id": i.to_string()})).collect(),
        ..FakeGateway::default()
    };
    let mut h = Harness::new(gateway, BridgeConfig::default()).await;
    h.bridge
        .handle_gateway_event(GatewayEvent::Message(InboundMessage {
            mentions: vec![BOT.into()],
            ..message("7")
        }))
        .await;
    h.bridge.flush().await;

    match h.inbox().as_slice() {
        [Envelope::MessageCreate {
            channel_id,
            messages,
        }] => {
            assert_eq!(channel_id.as_deref(), Some("500"));
            assert_eq!(messages.len(), 100);
            assert_eq!(messages[0]["id"], "0");
        },
        other => panic!("unexpected inbox: {other:?}"),
    }
}

#[tokio::test]
async fn failed_history_fetch_publishes_nothing() {
    let gateway = FakeGateway {
        fail_history: true,
        ..FakeGateway::default()
    };
    let mut h = Harness::new(gateway, BridgeConfig::default()).await;
    h.bridge
        .handle_gateway_event(GatewayEvent::Message(InboundMessage {
            mentions: vec![BOT.into()],
            ..message("7")
        }))
        .await;
    h.bridge.flush().await;
    assert!(h.inbox().is_empty());
}

// ── Outbound ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_message_is_sent_in_order() {
    let mut h = Harness::ready().await;
    let content = format!("{}\n{}", "a".repeat(1800), "b".repeat(699));
    h.deliver(json!({"type": "send_message", "channel_id": 500, "content": content}))
        .await;

    assert_eq!(h.gateway.sent(), vec![
        ("500".to_string(), "a".repeat(1800)),
        ("500".to_string(), "b".repeat(699)),
    ]);
}

#[tokio::test]
async fn sends_to_one_channel_never_overlap() {
    let gateway = FakeGateway::slow(&["500"], Duration::from_millis(20));
    let mut h = Harness::new(gateway, BridgeConfig::default()).await;
    for letter in ["a", "b"] {
        let envelope = json!({"type": "send_message", "channel_id": "500", "content": letter.repeat(4500)});
        h.bridge
            .handle_delivery(envelope.to_string().as_bytes())
            .await;
    }
    h.bridge.flush().await;

    assert_eq!(h.gateway.max_in_flight(), 1);
    let lengths: Vec<_> = h
        .gateway
        .sent()
        .into_iter()
        .map(|(_, chunk)| (chunk.chars().next().unwrap(), chunk.len()))
        .collect();
    assert_eq!(lengths, vec![
        ('a', 2000),
        ('a', 2000),
        ('a', 500),
        ('b', 2000),
        ('b', 2000),
        ('b', 500),
    ]);
}

#[tokio::test]
async fn sends_to_different_channels_run_side_by_side() {
    let gateway = FakeGateway::slow(&["500", "600"], Duration::from_millis(50));
    let mut h = Harness::new(gateway, BridgeConfig::default()).await;
    for channel in ["500", "600"] {
        let envelope = json!({"type": "send_message", "channel_id": channel, "content": "hi"});
        h.bridge
            .handle_delivery(envelope.to_string().as_bytes())
            .await;
    }
    h.bridge.flush().await;

    assert_eq!(h.gateway.max_in_flight(), 2);
    assert_eq!(h.gateway.sent().len(), 2);
}

#[tokio::test]
async fn failed_chunk_drops_the_rest() {
    let gateway = FakeGateway {
        fail_send_after: Some(1),
        ..FakeGateway::with_channel("500")
    };
    let mut h = Harness::new(gateway, BridgeConfig::default()).await;
    h.deliver(json!({"type": "send_message", "channel_id": "500", "content": "x".repeat(4500)}))
        .await;
    assert_eq!(h.gateway.sent().len(), 1);
}

#[rstest]
#[case::unknown_channel(json!({"type": "send_message", "channel_id": "501", "content": "hi"}))]
#[case::no_channel(json!({"type": "send_message", "content": "hi"}))]
#[case::blank_content(json!({"type": "send_message", "channel_id": "500", "content": "   "}))]
#[tokio::test]
async fn unsendable_messages_are_dropped(#[case] envelope: Value) {
    let mut h = Harness::ready().await;
    h.deliver(envelope).await;
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn typing_only_in_known_channels() {
    let mut h = Harness::ready().await;
    h.deliver(json!({"type": "start_typing", "channel_id": "500"}))
        .await;
    h.deliver(json!({"type": "start_typing", "channel_id": "501"}))
        .await;
    assert_eq!(*h.gateway.typing.lock().unwrap(), ["500"]);
}

#[tokio::test]
async fn garbage_and_misrouted_envelopes_are_harmless() {
    let mut h = Harness::ready().await;
    h.bridge.handle_delivery(b"not json").await;
    h.bridge.handle_delivery(br#"{"no": "type"}"#).await;
    h.deliver(json!({"type": "interaction_handle", "interaction": {"id": "1"}}))
        .await;
    h.deliver(json!({"type": "message_create", "channel_id": "500"}))
        .await;
    assert!(h.gateway.sent().is_empty());
    assert!(h.inbox().is_empty());
}

// ── Event loop ───────────────────────────────────────────────────────────────

async fn wait_for(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[test]
fn run_future_can_be_spawned() {
    fn assert_send<T: Send>(_: &T) {}

    let (_tx, rx) = mpsc::channel(1);
    let deliveries: Deliveries = Box::pin(futures::stream::empty());
    let bridge = Bridge::new(
        BridgeConfig::default(),
        Arc::new(FakeGateway::default()),
        Publisher::new(Arc::new(MemoryBroker::new()), "inbox"),
    );
    let run = bridge.run(rx, deliveries, CancellationToken::new());
    assert_send(&run);
}

#[tokio::test]
async fn slow_send_does_not_hold_up_acknowledges() {
    let send_delay = Duration::from_millis(300);
    let gateway = Arc::new(FakeGateway::slow(&["500"], send_delay));
    let broker = MemoryBroker::new();
    let deliveries = broker.consume("discord").await.unwrap();
    let bridge = Bridge::new(
        BridgeConfig::default(),
        gateway.clone(),
        Publisher::new(Arc::new(broker.clone()), "inbox"),
    );
    let (tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(bridge.run(rx, deliveries, cancel.clone()));

    tx.send(GatewayEvent::Ready {
        bot_user_id: BOT.into(),
    })
    .await
    .unwrap();
    broker
        .publish(
            "discord",
            Bytes::from(encode(&Envelope::send_message("500", "x".repeat(5000)))),
        )
        .await
        .unwrap();
    wait_for(|| gateway.in_flight.load(Ordering::SeqCst) > 0).await;

    let acked: Arc<Mutex<Vec<String>>> = Arc::default();
    let started = Instant::now();
    tx.send(GatewayEvent::Interaction(InboundInteraction {
        id: "42".into(),
        payload: json!({"id": "42", "data": {"name": "help"}}),
        handle: Box::new(FakeHandle {
            id: "42".into(),
            fail_ack: false,
            acked: acked.clone(),
            finished: Arc::default(),
        }),
    }))
    .await
    .unwrap();
    wait_for(|| !acked.lock().unwrap().is_empty()).await;
    assert!(started.elapsed() < send_delay, "ack waited {:?}", started.elapsed());

    wait_for(|| gateway.sent().len() == 3).await;
    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn run_loop_correlates_replies() {
    let broker = MemoryBroker::new();
    let deliveries = broker.consume("discord").await.unwrap();
    let bridge = Bridge::new(
        BridgeConfig::default(),
        Arc::new(FakeGateway::with_channel("500")),
        Publisher::new(Arc::new(broker.clone()), "inbox"),
    );
    let (tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(bridge.run(rx, deliveries, cancel.clone()));

    let finished: Finished = Arc::default();
    tx.send(GatewayEvent::Ready {
        bot_user_id: BOT.into(),
    })
    .await
    .unwrap();
    tx.send(GatewayEvent::Interaction(InboundInteraction {
        id: "42".into(),
        payload: json!({"id": "42", "data": {"name": "help"}}),
        handle: Box::new(FakeHandle {
            id: "42".into(),
            fail_ack: false,
            acked: Arc::default(),
            finished: finished.clone(),
        }),
    }))
    .await
    .unwrap();

    let mut forwarded = Vec::new();
    wait_for(|| {
        forwarded.extend(broker.drain("inbox"));
        !forwarded.is_empty()
    })
    .await;
    assert!(matches!(
        decode(&forwarded[0]).unwrap(),
        Envelope::InteractionHandle { .. }
    ));

    broker
        .publish(
            "discord",
            Bytes::from(encode(&Envelope::interaction_reply(
                Some("42".into()),
                "pong",
            ))),
        )
        .await
        .unwrap();
    wait_for(|| !finished.lock().unwrap().is_empty()).await;
    assert_eq!(finished.lock().unwrap()[0].1.content, "pong");

    cancel.cancel();
    task.await.unwrap();
}
