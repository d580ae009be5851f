//! Local Index Storage
//!
//! Everything the node keeps on the receiving end of crawling and DHT transfers.
//!
//! ## Core Concepts
//! - **Chunks**: `ChunkIndex` is an immutable sorted array of fixed-width keys with
//!   binary-search lookup. It backs every frozen segment.
//! - **References**: a `ReferenceContainer` holds the postings of one word hash.
//! - **Readers**: `IndexReader` is the capability set (`size`, `has`, `get`,
//!   `references`, `close`) shared by all backends.
//! - **Segments**: `SegmentedIndex` buffers writes in RAM and freezes them into new
//!   immutable segments; `UrlMetadataStore` holds the URL records; `Segment` ties both together.

pub mod chunk;
pub mod container;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod reader;
pub mod segment;
pub mod segmented;
