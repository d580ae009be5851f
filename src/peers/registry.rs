use super::types::{PeerHash, PeerSeed, PeerSummary};

use dashmap::DashMap;
use std::sync::Arc;

/// Every peer this node has heard from, keyed by peer hash.
pub struct PeerRegistry {
    local: PeerHash,
    seeds: DashMap<PeerHash, Arc<PeerSeed>>,
}

impl PeerRegistry {
    pub fn new(local: PeerHash) -> Self {
        tracing::info!("Peer registry initialized for local peer {}", local);
        Self {
            local,
            seeds: DashMap::new(),
        }
    }

    pub fn local_hash(&self) -> &PeerHash {
        &self.local
    }

    pub fn get(&self, hash: &PeerHash) -> Option<Arc<PeerSeed>> {
        self.seeds.get(hash).map(|seed| seed.value().clone())
    }

    /// Returns the seed for `hash`, registering an anonymous one on first contact.
    pub fn get_or_register(&self, hash: &PeerHash) -> Arc<PeerSeed> {
        let seed = self
            .seeds
            .entry(hash.clone())
            .or_insert_with(|| {
                tracing::info!("Registered new peer {}", hash);
                Arc::new(PeerSeed::new(hash.clone(), hash.as_str()))
            })
            .value()
            .clone();
        seed.touch();
        seed
    }

    pub fn insert(&self, seed: PeerSeed) -> Arc<PeerSeed> {
        let seed = Arc::new(seed);
        self.seeds.insert(seed.hash.clone(), seed.clone());
        seed
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Snapshot sorted by peer hash.
    pub fn summaries(&self) -> Vec<PeerSummary> {
        let mut all: Vec<PeerSummary> = self
            .seeds
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        all.sort_by(|a, b| a.hash.cmp(&b.hash));
        all
    }
}
