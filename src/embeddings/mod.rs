// Embeddings module
// Maps text to fixed-dimension vectors through a pluggable embedding model

pub mod ollama;

#[cfg(test)]
pub(crate) mod tests;

use crate::{RagError, Result};

pub use ollama::OllamaEmbedder;

/// A text embedding model.
///
/// Every vector produced by one embedder has the same dimension, and the
/// corpus and its queries must be embedded by the same model.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model
    fn model(&self) -> &str;

    /// Embed `texts`, returning one vector per input in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingUnavailable("model returned no vector".to_string()))
    }
}

/// Check that a batch of vectors matches its inputs and shares one dimension
pub(crate) fn check_batch(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(RagError::EmbeddingUnavailable(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }

    let Some(first) = vectors.first() else {
        return Ok(());
    };
    if first.is_empty() {
        return Err(RagError::InvalidDimension(
            "model returned an empty embedding".to_string(),
        ));
    }
    if let Some((position, bad)) = vectors
        .iter()
        .enumerate()
        .find(|(_, v)| v.len() != first.len())
    {
        return Err(RagError::InvalidDimension(format!(
            "embedding {} has dimension {}, expected {}",
            position,
            bad.len(),
            first.len()
        )));
    }

    Ok(())
}
