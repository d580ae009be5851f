use crate::index::hash::UrlHash;
use crate::peers::types::{PeerHash, now_ms};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_TRANSFER_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    DhtPush,
}

/// One URL that entered the local store from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub origin: EventOrigin,
    pub url_hash: UrlHash,
    pub url: String,
    pub initiator: PeerHash,
    pub timestamp_ms: u64,
}

/// Bounded ring of recent transfer events; the oldest event is dropped first.
pub struct TransferLog {
    events: Mutex<VecDeque<TransferEvent>>,
    capacity: usize,
}

impl TransferLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, origin: EventOrigin, url_hash: UrlHash, url: &str, initiator: &PeerHash) {
        let event = TransferEvent {
            origin,
            url_hash,
            url: url.to_string(),
            initiator: initiator.clone(),
            timestamp_ms: now_ms(),
        };
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn recent(&self) -> Vec<TransferEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for TransferLog {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSFER_LOG_CAPACITY)
    }
}
