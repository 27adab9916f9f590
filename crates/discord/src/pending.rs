use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::gateway::InteractionHandle;

struct Entry {
    handle: Box<dyn InteractionHandle>,
    created: Instant,
}

/// Deferred interactions waiting for a worker reply, keyed by interaction id.
///
/// Owned by the bridge loop; no interior locking.
pub struct PendingInteractions {
    entries: HashMap<String, Entry>,
    ttl: Duration,
}

impl PendingInteractions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Store a handle, returning the one it replaces, if any.
    pub fn insert(
        &mut self,
        id: String,
        handle: Box<dyn InteractionHandle>,
        now: Instant,
    ) -> Option<Box<dyn InteractionHandle>> {
        self.entries
            .insert(id, Entry {
                handle,
                created: now,
            })
            .map(|old| old.handle)
    }

    /// Remove and return the handle for `id`.
    pub fn take(&mut self, id: &str) -> Option<Box<dyn InteractionHandle>> {
        self.entries.remove(id).map(|entry| entry.handle)
    }

    /// Remove every entry older than the TTL.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(String, Box<dyn InteractionHandle>)> {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.created) >= ttl)
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.take(&id).map(|handle| (id, handle)))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
