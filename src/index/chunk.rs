//! Sorted Chunk Array
//!
//! A [`ChunkIndex`] is a flat byte buffer split into fixed-width records ("chunks")
//! that are sorted ascending in natural (unsigned, lexicographic) byte order.
//! It is built once and never mutated afterwards, so any number of threads can
//! search it at the same time without locking.
//!
//! ## Invariants
//! - `buffer.len()` is a multiple of `chunk_size` and `chunk_size > 0`.
//! - Records are strictly ascending (no duplicates).
//! - Every lookup key is exactly `chunk_size` bytes long. A key of any other
//!   width is a caller bug and panics.

use super::error::IndexError;
use std::cmp::Ordering;

/// Natural byte order over fixed-width records.
///
/// Compares at most `a.len()` bytes; both sides always have the same width here.
#[inline]
pub fn natural_order(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Immutable sorted array of fixed-width byte records.
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkIndex {
    buffer: Box<[u8]>,
    chunk_size: usize,
    count: usize,
}

impl ChunkIndex {
    /// Takes ownership of a buffer that is already sorted.
    pub fn new(buffer: Vec<u8>, chunk_size: usize) -> Result<Self, IndexError> {
        if chunk_size == 0 {
            return Err(IndexError::ZeroChunkSize);
        }
        if buffer.len() % chunk_size != 0 {
            return Err(IndexError::RaggedBuffer {
                len: buffer.len(),
                chunk_size,
            });
        }

        let count = buffer.len() / chunk_size;
        for i in 1..count {
            let prev = &buffer[(i - 1) * chunk_size..i * chunk_size];
            let cur = &buffer[i * chunk_size..(i + 1) * chunk_size];
            if natural_order(prev, cur) != Ordering::Less {
                return Err(IndexError::Unsorted { index: i });
            }
        }

        Ok(Self {
            buffer: buffer.into_boxed_slice(),
            chunk_size,
            count,
        })
    }

    /// Builds from keys that the caller guarantees to be ascending and unique.
    pub fn from_sorted_keys<'a, I>(keys: I, chunk_size: usize) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut buffer = Vec::new();
        for key in keys {
            if key.len() != chunk_size {
                return Err(IndexError::KeyWidth {
                    len: key.len(),
                    chunk_size,
                });
            }
            buffer.extend_from_slice(key);
        }
        Self::new(buffer, chunk_size)
    }

    /// Sorts and de-duplicates arbitrary keys before building.
    pub fn from_unsorted_keys(
        mut keys: Vec<Vec<u8>>,
        chunk_size: usize,
    ) -> Result<Self, IndexError> {
        keys.sort_unstable_by(|a, b| natural_order(a, b));
        keys.dedup();
        Self::from_sorted_keys(keys.iter().map(Vec::as_slice), chunk_size)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of records.
    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true iff some record byte-equals `key`.
    ///
    /// # Panics
    /// If `key.len() != self.chunk_size()`.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.position(key).is_some()
    }

    /// Index of the record equal to `key`, if present.
    ///
    /// # Panics
    /// If `key.len() != self.chunk_size()`.
    pub fn position(&self, key: &[u8]) -> Option<usize> {
        assert_eq!(
            key.len(),
            self.chunk_size,
            "lookup key width must equal chunk size"
        );
        self.search(key, 0, self.count)
    }

    fn search(&self, key: &[u8], lo: usize, hi: usize) -> Option<usize> {
        if lo >= hi {
            return None;
        }
        let mid = lo + (hi - lo) / 2;
        match natural_order(self.chunk(mid), key) {
            Ordering::Equal => Some(mid),
            Ordering::Less => self.search(key, mid + 1, hi),
            Ordering::Greater => self.search(key, lo, mid),
        }
    }

    /// Returns an owned copy of record `i`.
    ///
    /// # Panics
    /// If `i >= self.size()`.
    pub fn get(&self, i: usize) -> Vec<u8> {
        self.chunk(i).to_vec()
    }

    fn chunk(&self, i: usize) -> &[u8] {
        assert!(i < self.count, "chunk {i} out of range 0..{}", self.count);
        &self.buffer[i * self.chunk_size..(i + 1) * self.chunk_size]
    }

    /// Borrows the records in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.buffer.chunks_exact(self.chunk_size)
    }
}

impl std::fmt::Debug for ChunkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkIndex")
            .field("chunk_size", &self.chunk_size)
            .field("count", &self.count)
            .finish()
    }
}
