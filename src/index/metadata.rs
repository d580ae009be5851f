//! URL Metadata Store
//!
//! Holds one [`UrlMetadataEntry`] per URL hash. Reads go straight to a `DashMap`
//! and never wait on writers; every write goes through a single writer lock.
//!
//! Callers that need to attribute a size change to their own writes (the DHT
//! receiver's duplicate accounting) open a [`MetadataBatch`], which keeps the
//! writer lock for its whole lifetime.

use super::error::StoreError;
use super::hash::UrlHash;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Descriptive record for one remote or local URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMetadataEntry {
    pub hash: UrlHash,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    /// When the page was fetched (Unix ms).
    pub load_ms: u64,
    /// Freshness timestamp (Unix ms); the receiver rejects entries older than its cutoff.
    pub fresh_ms: u64,
    #[serde(default)]
    pub modified_ms: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub word_count: u32,
}

pub struct UrlMetadataStore {
    entries: DashMap<UrlHash, UrlMetadataEntry>,
    writer: Mutex<()>,
    capacity: Option<usize>,
    closed: AtomicBool,
}

impl UrlMetadataStore {
    pub fn new() -> Self {
        Self::with_capacity_limit(None)
    }

    /// `capacity` caps the number of distinct URLs; `None` means unbounded.
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            writer: Mutex::new(()),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn exists(&self, hash: &UrlHash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn load(&self, hash: &UrlHash) -> Option<UrlMetadataEntry> {
        self.entries.get(hash).map(|e| e.value().clone())
    }

    /// Stores or replaces a single entry.
    pub fn store(&self, entry: UrlMetadataEntry) -> Result<(), StoreError> {
        self.batch().store(entry)
    }

    pub fn remove(&self, hash: &UrlHash) -> Option<UrlMetadataEntry> {
        let _writer = self.writer.lock();
        self.entries.remove(hash).map(|(_, entry)| entry)
    }

    /// Opens an exclusive write scope.
    pub fn batch(&self) -> MetadataBatch<'_> {
        MetadataBatch {
            store: self,
            _writer: self.writer.lock(),
        }
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _writer = self.writer.lock();
        self.entries.clear();
        tracing::info!("URL metadata store closed");
    }

    fn insert_locked(&self, entry: UrlMetadataEntry) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        if let Some(capacity) = self.capacity
            && self.entries.len() >= capacity
            && !self.entries.contains_key(&entry.hash)
        {
            return Err(StoreError::Full { capacity });
        }
        self.entries.insert(entry.hash, entry);
        Ok(())
    }
}

impl Default for UrlMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write scope holding the store's writer lock.
///
/// No other writer can change the store while a batch is alive, so
/// `size()` taken before and after a run of `store()` calls measures exactly
/// the growth caused by this batch.
pub struct MetadataBatch<'a> {
    store: &'a UrlMetadataStore,
    _writer: MutexGuard<'a, ()>,
}

impl MetadataBatch<'_> {
    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn store(&self, entry: UrlMetadataEntry) -> Result<(), StoreError> {
        self.store.insert_locked(entry)
    }
}
