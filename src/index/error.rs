//! Errors raised by the index layer.

/// Rejected chunk buffer construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("buffer of {len} bytes is not a multiple of chunk size {chunk_size}")]
    RaggedBuffer { len: usize, chunk_size: usize },
    #[error("chunk {index} is not greater than its predecessor")]
    Unsorted { index: usize },
    #[error("key of {len} bytes does not match chunk size {chunk_size}")]
    KeyWidth { len: usize, chunk_size: usize },
}

/// A write that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store is closed")]
    Closed,
    #[error("store is full ({capacity} entries)")]
    Full { capacity: usize },
}
