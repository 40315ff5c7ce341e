use std::collections::HashMap;

use correlink_envelope::RequestId;
use serde_json::Value;
use tracing::debug;

use crate::config::DEFAULT_COMPACTION_THRESHOLD;
use crate::error::{CorrelatorError, Result};

/// One-shot continuation invoked with the response payload.
pub type ResponseCallback = Box<dyn FnOnce(Value) + Send>;

enum Slot {
    Pending(ResponseCallback),
    Tombstone,
}

/// Pending-callback registry of one connection.
///
/// Resolving or cancelling an entry leaves a tombstone behind instead of
/// removing the key. Every tombstone bumps a deletion counter; once the
/// counter reaches the compaction threshold the map is rebuilt from its live
/// entries only and the counter starts over. One compaction costs
/// O(live entries) and happens at most once per `threshold` deletions.
pub struct Registry {
    slots: HashMap<RequestId, Slot>,
    live: usize,
    deletes: usize,
    threshold: usize,
    compactions: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_COMPACTION_THRESHOLD)
    }

    /// Create a registry compacting after `threshold` deletions (minimum 1).
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            slots: HashMap::new(),
            live: 0,
            deletes: 0,
            threshold: threshold.max(1),
            compactions: 0,
        }
    }

    /// Register a pending callback.
    ///
    /// Fails with [`CorrelatorError::IdCollision`] if `id` is still pending;
    /// a live entry is never overwritten.
    pub fn insert(&mut self, id: RequestId, callback: ResponseCallback) -> Result<()> {
        if self.is_pending(&id) {
            return Err(CorrelatorError::IdCollision(id));
        }
        self.slots.insert(id, Slot::Pending(callback));
        self.live += 1;
        Ok(())
    }

    /// Take the callback pending under `id`, leaving a tombstone.
    ///
    /// Returns `None` for unknown, resolved or cancelled ids.
    pub fn resolve(&mut self, id: &RequestId) -> Option<ResponseCallback> {
        let slot = self.slots.get_mut(id)?;
        if !matches!(slot, Slot::Pending(_)) {
            return None;
        }
        let callback = match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Pending(callback) => callback,
            Slot::Tombstone => return None,
        };
        self.live -= 1;
        self.record_delete();
        Some(callback)
    }

    /// Drop the callback pending under `id` without invoking it.
    pub fn cancel(&mut self, id: &RequestId) -> bool {
        self.resolve(id).is_some()
    }

    /// Physically remove an entry that was never exposed to the peer.
    ///
    /// Does not count toward compaction.
    pub(crate) fn remove(&mut self, id: &RequestId) -> bool {
        if !self.is_pending(id) {
            return false;
        }
        self.slots.remove(id);
        self.live -= 1;
        true
    }

    /// Rebuild the map from live entries, discarding tombstones.
    pub fn compact(&mut self) {
        let before = self.slots.len();
        let slots = std::mem::take(&mut self.slots);
        self.slots = slots
            .into_iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .collect();
        self.deletes = 0;
        self.compactions += 1;
        debug!(
            before,
            live = self.slots.len(),
            compactions = self.compactions,
            "compacted pending registry"
        );
    }

    /// Drop every entry, pending or not. Returns how many were pending.
    pub fn clear(&mut self) -> usize {
        let abandoned = self.live;
        self.slots.clear();
        self.live = 0;
        self.deletes = 0;
        abandoned
    }

    /// Whether `id` has a live callback.
    pub fn is_pending(&self, id: &RequestId) -> bool {
        matches!(self.slots.get(id), Some(Slot::Pending(_)))
    }

    /// Ids with a live callback, in no particular order.
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of live callbacks.
    pub fn pending_count(&self) -> usize {
        self.live
    }

    /// Number of tombstones currently held.
    pub fn tombstone_count(&self) -> usize {
        self.slots.len() - self.live
    }

    /// Deletions recorded since the last compaction.
    pub fn deletes_since_compaction(&self) -> usize {
        self.deletes
    }

    /// Compactions performed so far.
    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn record_delete(&mut self) {
        self.deletes += 1;
        if self.deletes >= self.threshold {
            self.compact();
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("pending", &self.live)
            .field("tombstones", &self.tombstone_count())
            .field("deletes", &self.deletes)
            .field("threshold", &self.threshold)
            .field("compactions", &self.compactions)
            .finish()
    }
}
