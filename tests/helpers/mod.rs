#![allow(dead_code)]

use anyhow::Result;
use std::sync::Arc;

use memelord::clock::ManualClock;
use memelord::config::StoreConfig;
use memelord::embedding::Embedder;
use memelord::memory::store::MemoryStore;

pub const DAY: i64 = 86_400;

/// Deterministic 8-dim embedder: maps characters to vector positions, then
/// L2-normalizes. Content-reflective enough that overlapping text lands close
/// in cosine space.
pub struct CharEmbedder {
    dims: usize,
}

impl CharEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Embedder for CharEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for c in text.chars() {
            v[c as usize % self.dims] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            v[0] = 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// An embedder that always returns the wrong number of dimensions.
pub struct ShortEmbedder {
    pub declared: usize,
    pub actual: usize,
}

impl Embedder for ShortEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; self.actual])
    }

    fn dimensions(&self) -> usize {
        self.declared
    }
}

/// 8-dim store config on a file inside `dir`.
pub fn test_config(dir: &tempfile::TempDir, session_id: &str) -> StoreConfig {
    let mut config = StoreConfig::new(dir.path().join("memory.db"), session_id);
    config.dimensions = 8;
    config
}

/// Open an 8-dim store with the character embedder and the system clock.
pub fn open_store(dir: &tempfile::TempDir) -> MemoryStore {
    MemoryStore::open(test_config(dir, "test-session"), Arc::new(CharEmbedder::new(8))).unwrap()
}

/// Open an 8-dim store driven by a shared manual clock.
pub fn open_store_with_clock(dir: &tempfile::TempDir, clock: Arc<ManualClock>) -> MemoryStore {
    MemoryStore::open_with_clock(
        test_config(dir, "test-session"),
        Arc::new(CharEmbedder::new(8)),
        clock,
    )
    .unwrap()
}

/// Read a memory's weight straight from the file, or None if deleted.
pub fn weight_of(dir: &tempfile::TempDir, id: &str) -> Option<f64> {
    let conn = memelord::db::connect(dir.path().join("memory.db")).unwrap();
    conn.query_row(
        "SELECT weight FROM memories WHERE id = ?1",
        rusqlite::params![id],
        |r| r.get(0),
    )
    .ok()
}

/// All weights currently in the store.
pub fn all_weights(dir: &tempfile::TempDir) -> Vec<f64> {
    let conn = memelord::db::connect(dir.path().join("memory.db")).unwrap();
    let mut stmt = conn.prepare("SELECT weight FROM memories").unwrap();
    let rows = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<f64>, _>>()
        .unwrap();
    rows
}
