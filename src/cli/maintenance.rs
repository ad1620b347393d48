//! CLI maintenance commands — decay, purge, and embed-pending.

use anyhow::Result;

use crate::config::MemelordConfig;

/// Apply one decay pass and report what it did.
pub fn decay(config: &MemelordConfig) -> Result<()> {
    let mut store = super::open_store(config)?;
    let outcome = store.decay()?;
    println!(
        "Decayed {} memories, deleted {} exhausted ones.",
        outcome.decayed, outcome.deleted
    );
    Ok(())
}

/// Delete every memory below the weight threshold.
pub fn purge(config: &MemelordConfig, threshold: f64) -> Result<()> {
    let mut store = super::open_store(config)?;
    let deleted = store.purge(threshold)?;
    println!("Purged {deleted} memories below weight {threshold}.");
    Ok(())
}

/// Embed every pending memory so hook-stored rows become searchable.
pub fn embed_pending(config: &MemelordConfig) -> Result<()> {
    let mut store = super::open_store(config)?;
    let embedded = store.embed_pending()?;
    if embedded == 0 {
        println!("Nothing pending.");
    } else {
        println!("Embedded {embedded} pending memories.");
    }
    Ok(())
}
