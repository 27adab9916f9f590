//! In-process broker used by the standalone deployment and in tests.
//!
//! Queues are unbounded channels created on first use. Messages published
//! before anyone consumes are buffered. Acknowledgement is a no-op: nothing
//! survives the process, so there is nothing to redeliver.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    futures::StreamExt,
    tokio::sync::mpsc,
};

use crate::{Broker, Deliveries, Delivery, Error, Result};

struct Queue {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: Option<mpsc::UnboundedReceiver<Bytes>>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, Queue>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message currently buffered on a queue nobody consumes.
    pub fn drain(&self, queue: &str) -> Vec<Bytes> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let Some(rx) = queues.get_mut(queue).and_then(|q| q.rx.as_mut()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            out.push(payload);
        }
        out
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare(&self, queue: &str) -> Result<()> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.entry(queue.to_string()).or_insert_with(Queue::new);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Bytes) -> Result<()> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .entry(queue.to_string())
            .or_insert_with(Queue::new)
            .tx
            .send(payload)
            .map_err(|_| Error::Closed {
                queue: queue.to_string(),
            })
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries> {
        let rx = {
            let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            queues
                .entry(queue.to_string())
                .or_insert_with(Queue::new)
                .rx
                .take()
                .ok_or_else(|| Error::AlreadyConsumed {
                    queue: queue.to_string(),
                })?
        };
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            let payload = rx.recv().await?;
            Some((Ok(Delivery::new(payload, None)), rx))
        });
        Ok(stream.boxed())
    }
}
