//! The [`Embedder`] trait and its default implementation: a deterministic,
//! dependency-free 384-dimensional hashing embedder.
//!
//! This system deliberately avoids a network-backed or ML-model-backed
//! embedder: `search()` must be reproducible offline and without a model
//! download, so vulnerability-document retrieval stays usable in the same
//! zero-external-dependency spirit as the tool adapter plane. The hashing
//! embedder bag-of-tokens-hashes each input into a fixed-width vector and
//! L2-normalizes it, which is enough to support cosine similarity search
//! over a knowledge base on the order of hundreds of documents.

use std::sync::atomic::{AtomicU64, Ordering};

pub const EMBEDDING_DIM: usize = 384;

/// Anything that can turn text into a fixed-width embedding vector.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// A deterministic hashing embedder: tokenizes on whitespace/punctuation,
/// feature-hashes each token into one of [`EMBEDDING_DIM`] buckets with a
/// sign determined by a second hash (the standard feature-hashing trick to
/// reduce collision bias), then L2-normalizes the result.
#[derive(Debug, Clone, Default)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self { dim: EMBEDDING_DIM }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn hash_token(token: &str) -> (u64, u64) {
        // FNV-1a, twice, with different seeds, to get an index hash and an
        // independent sign hash without pulling in a second crate.
        fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
            let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
            for &byte in bytes {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
            hash
        }
        (fnv1a(token.as_bytes(), 0), fnv1a(token.as_bytes(), 1))
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dim];
        for token in Self::tokenize(text) {
            let (index_hash, sign_hash) = Self::hash_token(&token);
            let index = (index_hash as usize) % self.dim;
            let sign = if sign_hash % 2 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for a
/// zero vector on either side rather than producing NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Monotonically increasing counter used to assign stable synthetic IDs
/// where a caller doesn't supply one (e.g. ad-hoc custom vulnerability
/// entries added at runtime).
pub static NEXT_CUSTOM_DOC_ID: AtomicU64 = AtomicU64::new(1);

#[must_use]
pub fn next_custom_doc_id() -> u64 {
    NEXT_CUSTOM_DOC_ID.fetch_add(1, Ordering::Relaxed)
}
