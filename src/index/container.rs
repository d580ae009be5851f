use super::hash::{UrlHash, WordHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single posting: one occurrence record of a word inside one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordReference {
    pub url_hash: UrlHash,
    /// How often the word occurs in the document.
    pub hits: u32,
    /// Position of the first occurrence, counted in words.
    pub first_position: u32,
    /// Total words in the document.
    pub word_count: u32,
    /// Document modification time in Unix milliseconds.
    pub last_modified: u64,
}

/// Set of URL hashes used to restrict a container lookup.
///
/// An empty set means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleSet(BTreeSet<UrlHash>);

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url_hash: UrlHash) -> bool {
        self.0.insert(url_hash)
    }

    pub fn contains(&self, url_hash: &UrlHash) -> bool {
        self.0.contains(url_hash)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<UrlHash> for HandleSet {
    fn from_iter<I: IntoIterator<Item = UrlHash>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// All postings stored under one word hash.
///
/// References are kept sorted by URL hash with at most one entry per URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceContainer {
    term: WordHash,
    references: Vec<WordReference>,
}

impl ReferenceContainer {
    pub fn empty(term: WordHash) -> Self {
        Self {
            term,
            references: Vec::new(),
        }
    }

    pub fn from_references(term: WordHash, references: Vec<WordReference>) -> Self {
        let mut container = Self::empty(term);
        for reference in references {
            container.put(reference);
        }
        container
    }

    pub fn term(&self) -> WordHash {
        self.term
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn references(&self) -> &[WordReference] {
        &self.references
    }

    pub fn get(&self, url_hash: &UrlHash) -> Option<&WordReference> {
        self.references
            .binary_search_by(|r| r.url_hash.cmp(url_hash))
            .ok()
            .map(|i| &self.references[i])
    }

    /// Inserts `reference`, replacing an existing posting for the same URL only
    /// when the new one is at least as recent.
    pub fn put(&mut self, reference: WordReference) {
        match self
            .references
            .binary_search_by(|r| r.url_hash.cmp(&reference.url_hash))
        {
            Ok(i) => {
                if reference.last_modified >= self.references[i].last_modified {
                    self.references[i] = reference;
                }
            }
            Err(i) => self.references.insert(i, reference),
        }
    }

    /// Folds every posting of `other` into `self` using [`put`](Self::put) rules.
    pub fn merge(&mut self, other: &ReferenceContainer) {
        debug_assert_eq!(self.term, other.term);
        for reference in &other.references {
            self.put(reference.clone());
        }
    }

    /// Copy of this container keeping only URLs in `selection`.
    /// An empty selection keeps everything.
    pub fn filtered(&self, selection: &HandleSet) -> ReferenceContainer {
        if selection.is_empty() {
            return self.clone();
        }
        ReferenceContainer {
            term: self.term,
            references: self
                .references
                .iter()
                .filter(|r| selection.contains(&r.url_hash))
                .cloned()
                .collect(),
        }
    }

    pub fn remove(&mut self, url_hash: &UrlHash) -> Option<WordReference> {
        self.references
            .binary_search_by(|r| r.url_hash.cmp(url_hash))
            .ok()
            .map(|i| self.references.remove(i))
    }
}
