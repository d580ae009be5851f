use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identity of a node in the search network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PeerHash(pub String);

impl PeerHash {
    pub const LEN: usize = 12;

    /// Fresh random identity: the first 12 hex digits of a v4 UUID.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(uuid[..Self::LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PeerHash {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A known remote peer and what it has contributed to this node.
///
/// Counters are atomics so concurrent transfer handlers can bump them through a
/// shared `Arc<PeerSeed>` without locking the registry.
#[derive(Debug)]
pub struct PeerSeed {
    pub hash: PeerHash,
    pub name: String,
    received_urls: AtomicU64,
    last_seen_ms: AtomicU64,
}

impl PeerSeed {
    pub fn new(hash: PeerHash, name: impl Into<String>) -> Self {
        Self {
            hash,
            name: name.into(),
            received_urls: AtomicU64::new(0),
            last_seen_ms: AtomicU64::new(now_ms()),
        }
    }

    pub fn received_urls(&self) -> u64 {
        self.received_urls.load(Ordering::Relaxed)
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms.load(Ordering::Relaxed)
    }

    pub fn increment_received_urls(&self, count: u64) {
        self.received_urls.fetch_add(count, Ordering::Relaxed);
    }

    pub fn touch(&self) {
        self.last_seen_ms.fetch_max(now_ms(), Ordering::Relaxed);
    }

    pub fn summary(&self) -> PeerSummary {
        PeerSummary {
            hash: self.hash.clone(),
            name: self.name.clone(),
            received_urls: self.received_urls(),
            last_seen_ms: self.last_seen_ms(),
        }
    }
}

/// Serializable snapshot of a [`PeerSeed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub hash: PeerHash,
    pub name: String,
    pub received_urls: u64,
    pub last_seen_ms: u64,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
