use std::sync::Arc;

use {
    bytes::Bytes,
    courier_protocol::{Envelope, encode},
    tracing::debug,
};

use crate::{Broker, Result};

/// Publishes envelopes to one fixed queue.
#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn Broker>,
    queue: String,
}

impl Publisher {
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub async fn publish(&self, envelope: &Envelope) -> Result<()> {
        debug!(queue = %self.queue, kind = envelope.kind(), "publishing envelope");
        self.broker
            .publish(&self.queue, Bytes::from(encode(envelope)))
            .await
    }
}
