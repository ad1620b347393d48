//! Core memory engine — ranked retrieval, weight lifecycle, and statistics.
//!
//! The stateful entry point is [`store::MemoryStore`]. Retrieval SQL lives in
//! [`retrieval`], the decay/purge/contradict lifecycle in [`lifecycle`], and
//! aggregate queries in [`stats`]. Type definitions live in [`types`].

pub mod lifecycle;
pub mod retrieval;
pub mod stats;
pub mod store;
pub mod types;

use crate::error::StoreError;

/// Convert an f32 embedding slice to raw little-endian bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for v in embedding {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Convert a raw blob back to an f32 vector, checking the declared width.
///
/// Fails with [`StoreError::SchemaMismatch`] on any other length; blobs are
/// never silently truncated or padded.
pub fn bytes_to_embedding(bytes: &[u8], dimensions: usize) -> Result<Vec<f32>, StoreError> {
    let expected = dimensions * 4;
    if bytes.len() != expected {
        return Err(StoreError::SchemaMismatch {
            expected,
            got: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip_little_endian() {
        let v = vec![1.0f32, -0.5, 0.0, 3.25];
        let bytes = embedding_to_bytes(&v);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());

        let back = bytes_to_embedding(&bytes, 4).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn wrong_length_is_schema_mismatch() {
        let bytes = vec![0u8; 12];
        match bytes_to_embedding(&bytes, 4) {
            Err(StoreError::SchemaMismatch { expected, got }) => {
                assert_eq!(expected, 16);
                assert_eq!(got, 12);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
