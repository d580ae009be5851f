//! Segmented Reverse Word Index
//!
//! Stores word hash -> [`ReferenceContainer`] mappings in two tiers:
//!
//! - **RAM buffer**: a sorted map that absorbs all writes behind an exclusive lock.
//! - **Frozen segments**: immutable [`FrozenSegment`]s, each a [`ChunkIndex`] of keys
//!   with a parallel vector of containers. A flush turns the buffer into a new
//!   segment; a merge compacts all segments into one new version.
//!
//! Segments are published by swapping an `Arc`'d list, so a reader either sees the
//! old list or the new one and never a half-built segment.

use super::chunk::ChunkIndex;
use super::container::{HandleSet, ReferenceContainer, WordReference};
use super::error::{IndexError, StoreError};
use super::hash::{HASH_LEN, WordHash};
use super::reader::{IndexReader, KeyWalk, ReferenceIter, walk_order};

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Number of buffered terms after which `add` flushes on its own.
pub const DEFAULT_RAM_LIMIT: usize = 4096;

/// Frozen segment count above which a flush compacts all segments into one.
pub const DEFAULT_MERGE_THRESHOLD: usize = 8;

/// Immutable, sorted block of containers keyed by a [`ChunkIndex`].
#[derive(Debug)]
pub struct FrozenSegment {
    keys: ChunkIndex,
    containers: Vec<ReferenceContainer>,
}

impl FrozenSegment {
    pub fn build(entries: &BTreeMap<WordHash, ReferenceContainer>) -> Result<Self, IndexError> {
        let keys = ChunkIndex::from_sorted_keys(entries.keys().map(WordHash::as_bytes), HASH_LEN)?;
        let containers = entries.values().cloned().collect();
        Ok(Self { keys, containers })
    }

    pub fn lookup(&self, term: &WordHash) -> Option<&ReferenceContainer> {
        self.keys
            .position(term.as_bytes())
            .map(|i| &self.containers[i])
    }

    pub fn terms(&self) -> impl Iterator<Item = WordHash> + '_ {
        self.keys.iter().filter_map(WordHash::from_bytes)
    }

    pub fn reference_count(&self) -> usize {
        self.containers.iter().map(ReferenceContainer::len).sum()
    }

    fn without(&self, term: &WordHash) -> Result<Self, IndexError> {
        let entries: BTreeMap<WordHash, ReferenceContainer> = self
            .containers
            .iter()
            .filter(|c| &c.term() != term)
            .map(|c| (c.term(), c.clone()))
            .collect();
        Self::build(&entries)
    }
}

impl IndexReader for FrozenSegment {
    fn size(&self) -> usize {
        self.keys.size()
    }

    fn has(&self, term: &WordHash) -> bool {
        self.keys.contains(term.as_bytes())
    }

    fn get(&self, term: &WordHash, url_selection: &HandleSet) -> ReferenceContainer {
        match self.lookup(term) {
            Some(container) => container.filtered(url_selection),
            None => ReferenceContainer::empty(*term),
        }
    }

    fn references(&self, start: &WordHash, rotate: bool) -> ReferenceIter<'_> {
        let keys = walk_order(self.terms().collect(), start, rotate);
        Box::new(KeyWalk::new(self, keys))
    }

    fn close(&self) {}
}

type SegmentList = Arc<Vec<Arc<FrozenSegment>>>;

/// Writable reference store made of a RAM buffer and frozen segments.
pub struct SegmentedIndex {
    ram: RwLock<BTreeMap<WordHash, ReferenceContainer>>,
    frozen: RwLock<SegmentList>,
    /// Serializes flush, merge and delete, which all republish the segment list.
    writer: Mutex<()>,
    ram_limit: usize,
    merge_threshold: usize,
    closed: AtomicBool,
}

impl SegmentedIndex {
    pub fn new() -> Self {
        Self::with_ram_limit(DEFAULT_RAM_LIMIT)
    }

    pub fn with_ram_limit(ram_limit: usize) -> Self {
        Self::with_limits(ram_limit, DEFAULT_MERGE_THRESHOLD)
    }

    pub fn with_limits(ram_limit: usize, merge_threshold: usize) -> Self {
        Self {
            ram: RwLock::new(BTreeMap::new()),
            frozen: RwLock::new(Arc::new(Vec::new())),
            writer: Mutex::new(()),
            ram_limit: ram_limit.max(1),
            merge_threshold: merge_threshold.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Adds a single posting under `term`.
    pub fn add(&self, term: WordHash, reference: WordReference) -> Result<(), StoreError> {
        self.add_container(ReferenceContainer::from_references(term, vec![reference]))
    }

    /// Merges a whole container into the RAM buffer.
    pub fn add_container(&self, container: ReferenceContainer) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        if container.is_empty() {
            return Ok(());
        }

        let buffered = {
            let mut ram = self.ram.write();
            ram.entry(container.term())
                .and_modify(|existing| existing.merge(&container))
                .or_insert(container);
            ram.len()
        };

        if buffered >= self.ram_limit
            && let Err(e) = self.flush()
        {
            tracing::error!("Automatic flush of RAM buffer failed: {}", e);
        }
        Ok(())
    }

    /// Freezes the RAM buffer into a new segment.
    ///
    /// Once more than `merge_threshold` segments exist they are compacted into one.
    pub fn flush(&self) -> Result<(), IndexError> {
        let _writer = self.writer.lock();
        let segments = {
            let mut ram = self.ram.write();
            if ram.is_empty() {
                return Ok(());
            }

            let segment = Arc::new(FrozenSegment::build(&ram)?);
            let terms = segment.size();
            let mut frozen = self.frozen.write();
            let mut next: Vec<Arc<FrozenSegment>> = frozen.as_ref().clone();
            next.push(segment);
            let count = next.len();
            *frozen = Arc::new(next);
            ram.clear();

            tracing::debug!("Flushed {} terms into a new frozen segment", terms);
            count
        };

        if segments > self.merge_threshold {
            self.merge_locked()?;
        }
        Ok(())
    }

    /// Compacts all frozen segments into a single one.
    pub fn merge_segments(&self) -> Result<(), IndexError> {
        let _writer = self.writer.lock();
        self.merge_locked()
    }

    // Caller holds the writer lock.
    fn merge_locked(&self) -> Result<(), IndexError> {
        let segments = self.frozen.read().clone();
        if segments.len() < 2 {
            return Ok(());
        }

        let mut merged: BTreeMap<WordHash, ReferenceContainer> = BTreeMap::new();
        for segment in segments.iter() {
            for container in &segment.containers {
                merged
                    .entry(container.term())
                    .and_modify(|existing| existing.merge(container))
                    .or_insert_with(|| container.clone());
            }
        }

        let compacted = Arc::new(FrozenSegment::build(&merged)?);
        *self.frozen.write() = Arc::new(vec![compacted]);

        tracing::info!("Merged {} frozen segments into one", segments.len());
        Ok(())
    }

    /// Removes `term` everywhere and returns what was stored under it.
    pub fn delete(&self, term: &WordHash) -> Result<ReferenceContainer, IndexError> {
        let _writer = self.writer.lock();
        let mut ram = self.ram.write();
        let mut removed = ReferenceContainer::empty(*term);

        let current = self.frozen.read().clone();
        let mut next = Vec::with_capacity(current.len());
        for segment in current.iter() {
            match segment.lookup(term) {
                Some(container) => {
                    removed.merge(container);
                    next.push(Arc::new(segment.without(term)?));
                }
                None => next.push(segment.clone()),
            }
        }
        if let Some(buffered) = ram.remove(term) {
            removed.merge(&buffered);
        }
        *self.frozen.write() = Arc::new(next);

        Ok(removed)
    }

    pub fn segment_count(&self) -> usize {
        self.frozen.read().len()
    }

    pub fn ram_size(&self) -> usize {
        self.ram.read().len()
    }

    /// Total postings across all terms.
    pub fn reference_count(&self) -> usize {
        self.sorted_terms()
            .iter()
            .map(|term| self.get(term, &HandleSet::new()).len())
            .sum()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Readers take the RAM read lock before cloning the segment list, so a
    // concurrent flush is either fully visible or not at all.
    fn sorted_terms(&self) -> Vec<WordHash> {
        let ram = self.ram.read();
        let segments = self.frozen.read().clone();
        let mut terms: BTreeSet<WordHash> = ram.keys().copied().collect();
        drop(ram);
        for segment in segments.iter() {
            terms.extend(segment.terms());
        }
        terms.into_iter().collect()
    }
}

impl Default for SegmentedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexReader for SegmentedIndex {
    fn size(&self) -> usize {
        self.sorted_terms().len()
    }

    fn has(&self, term: &WordHash) -> bool {
        let ram = self.ram.read();
        if ram.contains_key(term) {
            return true;
        }
        let segments = self.frozen.read().clone();
        drop(ram);
        segments.iter().any(|segment| segment.has(term))
    }

    fn get(&self, term: &WordHash, url_selection: &HandleSet) -> ReferenceContainer {
        let ram = self.ram.read();
        let buffered = ram.get(term).cloned();
        let segments = self.frozen.read().clone();
        drop(ram);

        let mut result = ReferenceContainer::empty(*term);
        for segment in segments.iter() {
            if let Some(container) = segment.lookup(term) {
                result.merge(container);
            }
        }
        if let Some(buffered) = buffered {
            result.merge(&buffered);
        }
        result.filtered(url_selection)
    }

    fn references(&self, start: &WordHash, rotate: bool) -> ReferenceIter<'_> {
        let keys = walk_order(self.sorted_terms(), start, rotate);
        Box::new(KeyWalk::new(self, keys))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _writer = self.writer.lock();
        self.ram.write().clear();
        *self.frozen.write() = Arc::new(Vec::new());
        tracing::info!("Reference index closed");
    }
}
