//! Dependency-free deterministic embedder.
//!
//! Hashes byte unigrams and bigrams of the input into vector positions, then
//! L2-normalizes. Not a semantic model — overlapping text maps to overlapping
//! positions, which is enough for the CLI, the serve path without a real
//! model, and deterministic tests. Hosts that want actual semantics inject
//! their own [`super::Embedder`].

use anyhow::Result;

use super::Embedder;

pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Embedder for HashedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimensions];

        let bytes = text.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            v[b as usize % self.dimensions] += 1.0;
            if i > 0 {
                let bigram = bytes[i - 1] as usize * 31 + b as usize;
                v[bigram % self.dimensions] += 0.5;
            }
        }

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            // empty input: a fixed basis vector keeps cosine distance defined
            v[0] = 1.0;
        }

        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn output_is_normalized_and_deterministic() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.embed("the auth middleware lives in src/middleware").unwrap();
        let b = embedder.embed("the auth middleware lives in src/middleware").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similar_text_is_closer_than_unrelated() {
        let embedder = HashedEmbedder::new(64);
        let query = embedder.embed("fix the auth middleware").unwrap();
        let related = embedder.embed("auth middleware is in src/middleware/auth.rs").unwrap();
        let unrelated = embedder.embed("zzz qqq 000 111 222").unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn empty_input_still_embeds() {
        let embedder = HashedEmbedder::new(8);
        let v = embedder.embed("").unwrap();
        assert_eq!(v.len(), 8);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
