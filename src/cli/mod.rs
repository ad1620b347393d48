pub mod doctor;
pub mod maintenance;
pub mod stats;

use anyhow::Result;

use crate::config::MemelordConfig;
use crate::embedding;
use crate::memory::store::MemoryStore;

/// Open a store for a CLI invocation.
///
/// The session id comes from `MEMELORD_SESSION` when the invoking hook set
/// one, otherwise a fresh id is generated for this process.
pub fn open_store(config: &MemelordConfig) -> Result<MemoryStore> {
    let session_id = std::env::var("MEMELORD_SESSION")
        .unwrap_or_else(|_| uuid::Uuid::now_v7().to_string());
    let embedder = embedding::create_embedder(
        &config.embedding.provider,
        config.retrieval.dimensions,
    )?;
    MemoryStore::open(config.store_config(session_id), embedder)
}
