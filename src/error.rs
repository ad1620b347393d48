//! Typed error kinds for the memory store.
//!
//! Internal code uses `anyhow::Result` with context chains; operations that can
//! fail in a way callers need to distinguish attach a [`StoreError`] so it can
//! be recovered with `err.downcast_ref::<StoreError>()`.

use thiserror::Error;

/// Error kinds the store surfaces to callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connect attempts exhausted while another process held the file lock.
    #[error("database locked after {attempts} connect attempts")]
    StorageLocked { attempts: u32 },

    /// A stored vector blob has the wrong byte length for the configured
    /// dimensionality. Never silently truncated.
    #[error("embedding blob is {got} bytes, expected {expected}")]
    SchemaMismatch { expected: usize, got: usize },

    /// The injected embedder returned a vector of the wrong length.
    #[error("embedder returned {got} dimensions, expected {expected}")]
    EmbedDimensionMismatch { expected: usize, got: usize },

    /// The injected embedder failed.
    #[error("embedding failed: {0}")]
    EmbedFailure(String),

    /// A caller-supplied argument is out of range or unknown.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
