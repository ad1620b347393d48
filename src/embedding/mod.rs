pub mod hashed;

use anyhow::Result;
use std::sync::Arc;

/// Trait for embedding text into fixed-width vectors.
///
/// The store never computes embeddings itself; callers inject an
/// implementation. Implementations must return exactly `dimensions()` floats
/// for every input — the store fails the operation otherwise. All methods are
/// synchronous; async callers should use `tokio::task::spawn_blocking`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The number of dimensions this embedder produces.
    fn dimensions(&self) -> usize;
}

/// Adapter so a plain closure can serve as an embedder.
pub struct FnEmbedder<F> {
    f: F,
    dimensions: usize,
}

impl<F> FnEmbedder<F>
where
    F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
{
    pub fn new(dimensions: usize, f: F) -> Self {
        Self { f, dimensions }
    }
}

impl<F> Embedder for FnEmbedder<F>
where
    F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (self.f)(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Create an embedder from config.
///
/// `"hashed"` is the built-in dependency-free provider; hosts with a real
/// model wire their own [`Embedder`] instead of going through this factory.
pub fn create_embedder(provider: &str, dimensions: usize) -> Result<Arc<dyn Embedder>> {
    match provider {
        "hashed" => Ok(Arc::new(hashed::HashedEmbedder::new(dimensions))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hashed"),
    }
}
