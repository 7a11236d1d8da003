// Vector index module
// Exact inner-product search over L2-normalized embeddings, plus on-disk formats

pub mod flat;
pub mod npy;

pub use flat::FlatIndex;
pub use npy::{VectorMatrix, read_vectors, write_vectors};

use crate::{RagError, Result};

/// A single search result: position of the stored vector and its similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Row of the matching vector, which is also the position of its chunk
    pub position: usize,
    /// Inner product between the normalized query and stored vector
    pub score: f32,
}

/// Common interface for similarity indices.
///
/// Implementations are read-only once constructed, so a single index can be
/// shared between concurrent queries.
pub trait VectorIndex: Send + Sync {
    /// Dimension of every stored vector
    fn dimension(&self) -> usize;

    /// Number of stored vectors
    fn ntotal(&self) -> usize;

    /// Return the `min(k, ntotal)` best matches for `query`.
    ///
    /// Results are sorted by descending score; equal scores are ordered by
    /// ascending position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` if the query has the wrong length, contains
    /// non-finite values, or has zero norm.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn l2_norm(vector: &[f32]) -> f32 {
    inner_product(vector, vector).sqrt()
}

/// Scale `vector` to unit L2 norm.
///
/// Corpus vectors and queries both go through this function, so their inner
/// product is their cosine similarity. Zero and non-finite vectors have no
/// direction and are rejected.
#[inline]
pub fn normalize(vector: &[f32]) -> Result<Vec<f32>> {
    if let Some(component) = vector.iter().position(|v| !v.is_finite()) {
        return Err(RagError::InvalidDimension(format!(
            "non-finite value at component {}",
            component
        )));
    }

    let norm = l2_norm(vector);
    if norm == 0.0 {
        return Err(RagError::InvalidDimension(
            "zero vector cannot be normalized".to_string(),
        ));
    }

    Ok(vector.iter().map(|v| v / norm).collect())
}
