//! Peer-to-Peer Search Node Library
//!
//! Core modules of a search peer: a local reverse word index, the staged pipeline
//! that fills it, and the DHT endpoint through which other peers push index data.
//!
//! ## Architecture Modules
//! - **`index`**: fixed-width `ChunkIndex` keys, reference containers, the
//!   `IndexReader` abstraction and the URL metadata store, bundled as a `Segment`.
//! - **`workflow`**: bounded-queue stages with worker pools, shutdown propagation,
//!   cancellation and per-cycle accounting.
//! - **`indexing`**: the condense -> store pipeline for locally parsed documents.
//! - **`peers`**: remote peer identities and their contribution counters.
//! - **`replication`**: inbound DHT transfers (authentication, policy, duplicate
//!   accounting, transfer log).
//! - **`config`**: command-line and environment configuration.

pub mod config;
pub mod index;
pub mod indexing;
pub mod peers;
pub mod replication;
pub mod workflow;
