// Retrieval module
// Embeds a query, searches the index, and maps hit positions back to chunk text


use tracing::debug;

use crate::embeddings::Embedder;
use crate::index::{FlatIndex, VectorIndex};
use crate::store::ChunkStore;
use crate::utilities::truncate_chars;
use crate::{RagError, Result};

pub const DEFAULT_TOP_K: usize = 5;

/// A chunk returned for a query, best match first
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Position of the chunk in the store and of its vector in the index
    pub position: usize,
    pub text: String,
    /// Cosine similarity between query and chunk
    pub score: f32,
}

impl RetrievedChunk {
    /// First `max_chars` characters of the chunk text
    #[inline]
    pub fn snippet(&self, max_chars: usize) -> &str {
        truncate_chars(&self.text, max_chars)
    }
}

/// Read-only view over an index and the chunk store it was built from
#[derive(Debug, Clone, Copy)]
pub struct Retriever<'a, I: VectorIndex + ?Sized = FlatIndex> {
    index: &'a I,
    chunks: &'a ChunkStore,
}

impl<'a, I: VectorIndex + ?Sized> Retriever<'a, I> {
    /// Pair `index` with `chunks`, rejecting them if their sizes differ
    #[inline]
    pub fn new(index: &'a I, chunks: &'a ChunkStore) -> Result<Self> {
        if index.ntotal() != chunks.len() {
            return Err(RagError::StoreIndexMismatch(format!(
                "index holds {} vectors but the chunk store holds {} chunks",
                index.ntotal(),
                chunks.len()
            )));
        }

        Ok(Self { index, chunks })
    }

    /// Number of retrievable chunks
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Clamp a requested `k` to `[1, ntotal]`
    #[inline]
    pub fn clamp_k(&self, k: usize) -> usize {
        k.clamp(1, self.index.ntotal().max(1))
    }

    /// Embed `query` and return its `k` most similar chunks
    #[inline]
    pub fn retrieve<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vector = embedder.embed_one(query)?;
        self.search_vector(&query_vector, k)
    }

    /// Search with an already embedded query
    #[inline]
    pub fn search_vector(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let k = self.clamp_k(k);
        let hits = self.index.search(query_vector, k)?;

        let results = hits
            .into_iter()
            .map(|hit| {
                let text = self.chunks.get(hit.position).ok_or_else(|| {
                    RagError::StoreIndexMismatch(format!(
                        "index returned position {} outside the chunk store",
                        hit.position
                    ))
                })?;
                Ok(RetrievedChunk {
                    position: hit.position,
                    text: text.to_string(),
                    score: hit.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Retrieved {} chunks (k = {})", results.len(), k);
        Ok(results)
    }
}

/// Retrieve the `k` chunks most similar to `query` in one call
#[inline]
pub fn retrieve<E, I>(
    query: &str,
    embedder: &E,
    index: &I,
    chunks: &ChunkStore,
    k: usize,
) -> Result<Vec<RetrievedChunk>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    Retriever::new(index, chunks)?.retrieve(embedder, query, k)
}
