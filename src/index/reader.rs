//! Read-side abstraction shared by every reference store backend.

use super::container::{HandleSet, ReferenceContainer};
use super::hash::WordHash;

/// Lazy sequence of containers in key order.
pub type ReferenceIter<'a> = Box<dyn Iterator<Item = ReferenceContainer> + Send + 'a>;

/// Capabilities every reference store offers to readers.
///
/// Implementations follow a single-writer / multi-reader discipline: a `true`
/// from [`has`](Self::has) followed by [`get`](Self::get) on the same key only
/// yields an empty container if a `delete` ran in between.
pub trait IndexReader: Send + Sync {
    /// Number of distinct word hashes held.
    fn size(&self) -> usize;

    fn has(&self, term: &WordHash) -> bool;

    /// Postings for `term`, restricted to `url_selection` when it is non-empty.
    /// Unknown terms give an empty container.
    fn get(&self, term: &WordHash, url_selection: &HandleSet) -> ReferenceContainer;

    /// Containers in ascending key order starting at `start`.
    ///
    /// With `rotate` the walk wraps around to the smallest key and stops right
    /// before reaching `start` again, so every key is visited exactly once.
    fn references(&self, start: &WordHash, rotate: bool) -> ReferenceIter<'_>;

    /// Releases held resources. Calling it again is a no-op.
    fn close(&self);
}

/// Orders a sorted key snapshot for a (possibly rotating) walk from `start`.
pub(crate) fn walk_order(sorted: Vec<WordHash>, start: &WordHash, rotate: bool) -> Vec<WordHash> {
    let split = sorted.partition_point(|k| k < start);
    if !rotate {
        return sorted[split..].to_vec();
    }
    let mut ordered = Vec::with_capacity(sorted.len());
    ordered.extend_from_slice(&sorted[split..]);
    ordered.extend_from_slice(&sorted[..split]);
    ordered
}

/// Iterator that resolves one key at a time against its reader.
pub(crate) struct KeyWalk<'a, R: IndexReader + ?Sized> {
    reader: &'a R,
    keys: std::vec::IntoIter<WordHash>,
}

impl<'a, R: IndexReader + ?Sized> KeyWalk<'a, R> {
    pub(crate) fn new(reader: &'a R, keys: Vec<WordHash>) -> Self {
        Self {
            reader,
            keys: keys.into_iter(),
        }
    }
}

impl<R: IndexReader + ?Sized> Iterator for KeyWalk<'_, R> {
    type Item = ReferenceContainer;

    fn next(&mut self) -> Option<Self::Item> {
        let everything = HandleSet::new();
        for key in self.keys.by_ref() {
            let container = self.reader.get(&key, &everything);
            // Deleted since the snapshot.
            if !container.is_empty() {
                return Some(container);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}
