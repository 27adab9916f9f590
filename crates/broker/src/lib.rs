//! Message broker abstraction.
//!
//! A queue is a durable, at-least-once, work-shared channel identified by
//! name. Consumers receive [`Delivery`] values and acknowledge each one after
//! processing; an unacknowledged delivery may be redelivered.

pub mod error;
pub mod memory;
pub mod nats;
pub mod publisher;

use {async_trait::async_trait, bytes::Bytes, futures::stream::BoxStream};

pub use {
    error::{Error, Result},
    memory::MemoryBroker,
    nats::NatsBroker,
    publisher::Publisher,
};

/// Stream of deliveries from one queue.
pub type Deliveries = BoxStream<'static, Result<Delivery>>;

/// Publish/consume over named queues.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Make sure `queue` exists. Publishing to an undeclared queue is allowed
    /// to fail.
    async fn declare(&self, queue: &str) -> Result<()>;

    async fn publish(&self, queue: &str, payload: Bytes) -> Result<()>;

    /// Start consuming `queue`.
    async fn consume(&self, queue: &str) -> Result<Deliveries>;
}

/// Settles a delivery with the broker.
#[async_trait]
pub trait Acker: Send {
    async fn ack(self: Box<Self>) -> Result<()>;
}

/// One message received from a queue.
pub struct Delivery {
    payload: Bytes,
    acker: Option<Box<dyn Acker>>,
}

impl Delivery {
    pub fn new(payload: Bytes, acker: Option<Box<dyn Acker>>) -> Self {
        Self { payload, acker }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledge the delivery so the broker will not redeliver it.
    pub async fn ack(self) -> Result<()> {
        match self.acker {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("len", &self.payload.len())
            .field("ackable", &self.acker.is_some())
            .finish()
    }
}
