//! NATS JetStream broker.
//!
//! Each queue `Q` maps to a JetStream stream named `Q` bound to subject `Q`
//! with work-queue retention, consumed through a durable pull consumer also
//! named `Q`. Several worker processes sharing the durable consumer split the
//! queue between them; a message that is not acked before the consumer's ack
//! wait is redelivered.

use {
    async_nats::jetstream::{
        self,
        consumer::{AckPolicy, pull},
        stream::{self, RetentionPolicy},
    },
    async_trait::async_trait,
    bytes::Bytes,
    futures::StreamExt,
    tracing::{debug, info},
};

use crate::{Acker, Broker, Deliveries, Delivery, Error, Result};

pub struct NatsBroker {
    jetstream: jetstream::Context,
}

impl NatsBroker {
    /// Connect to the NATS server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::external(format!("connect to {url}"), e))?;
        info!(url, "connected to nats");
        Ok(Self {
            jetstream: jetstream::new(client),
        })
    }

    async fn stream(&self, queue: &str) -> Result<stream::Stream> {
        self.jetstream
            .get_or_create_stream(stream::Config {
                name: queue.to_string(),
                subjects: vec![queue.to_string()],
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::external(format!("declare queue {queue}"), e))
    }
}

#[async_trait]
impl Broker for NatsBroker {
    async fn declare(&self, queue: &str) -> Result<()> {
        self.stream(queue).await?;
        debug!(queue, "queue declared");
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Bytes) -> Result<()> {
        let ack = self
            .jetstream
            .publish(queue.to_string(), payload)
            .await
            .map_err(|e| Error::external(format!("publish to {queue}"), e))?;
        ack.await
            .map_err(|e| Error::external(format!("publish ack from {queue}"), e))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries> {
        let consumer = self
            .stream(queue)
            .await?
            .get_or_create_consumer(queue, pull::Config {
                durable_name: Some(queue.to_string()),
                ack_policy: AckPolicy::Explicit,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::external(format!("create consumer for {queue}"), e))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| Error::external(format!("consume {queue}"), e))?;

        let queue = queue.to_string();
        let deliveries = messages.map(move |item| match item {
            Ok(message) => {
                let payload = message.message.payload.clone();
                Ok(Delivery::new(payload, Some(Box::new(NatsAcker(message)))))
            },
            Err(e) => Err(Error::external(format!("receive from {queue}"), e)),
        });
        Ok(deliveries.boxed())
    }
}

struct NatsAcker(jetstream::Message);

#[async_trait]
impl Acker for NatsAcker {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.0
            .ack()
            .await
            .map_err(|e| Error::external_boxed("ack delivery", e))
    }
}
