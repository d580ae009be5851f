use super::container::WordReference;
use super::error::StoreError;
use super::hash::WordHash;
use super::metadata::{UrlMetadataEntry, UrlMetadataStore};
use super::reader::IndexReader;
use super::segmented::SegmentedIndex;

use serde::Serialize;

/// The node's local index: the reverse word index plus the URL metadata it points at.
pub struct Segment {
    words: SegmentedIndex,
    urls: UrlMetadataStore,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub words: usize,
    pub references: usize,
    pub urls: usize,
    pub frozen_segments: usize,
    pub buffered_words: usize,
}

impl Segment {
    pub fn new(ram_limit: usize, url_capacity: Option<usize>) -> Self {
        Self {
            words: SegmentedIndex::with_ram_limit(ram_limit),
            urls: UrlMetadataStore::with_capacity_limit(url_capacity),
        }
    }

    pub fn words(&self) -> &SegmentedIndex {
        &self.words
    }

    pub fn urls(&self) -> &UrlMetadataStore {
        &self.urls
    }

    /// Stores a document's metadata, then one posting per word.
    ///
    /// The metadata goes first so a posting never points at an unknown URL.
    pub fn store_document(
        &self,
        entry: UrlMetadataEntry,
        postings: impl IntoIterator<Item = (WordHash, WordReference)>,
    ) -> Result<usize, StoreError> {
        self.urls.store(entry)?;
        let mut stored = 0;
        for (term, reference) in postings {
            self.words.add(term, reference)?;
            stored += 1;
        }
        Ok(stored)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            words: self.words.size(),
            references: self.words.reference_count(),
            urls: self.urls.size(),
            frozen_segments: self.words.segment_count(),
            buffered_words: self.words.ram_size(),
        }
    }

    pub fn close(&self) {
        self.words.close();
        self.urls.close();
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            words: SegmentedIndex::new(),
            urls: UrlMetadataStore::new(),
        }
    }
}
