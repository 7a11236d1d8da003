
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Configuration for content chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in characters
    pub chunk_size: usize,
    /// Characters shared between adjacent windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Distance between the starts of two adjacent windows.
    ///
    /// Fails with `InvalidConfiguration` when the stride would not be positive,
    /// which would otherwise never advance past the first window.
    #[inline]
    pub fn stride(&self) -> Result<usize> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        if self.overlap >= self.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.chunk_size
            )));
        }

        Ok(self.chunk_size - self.overlap)
    }
}

/// Character offsets of a chunk within the source text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `text` into overlapping windows of `chunk_size` characters.
#[inline]
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    chunk_text(text, &ChunkingConfig { chunk_size, overlap })
}

/// Split `text` into overlapping windows using `config`.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    Ok(chunk_with_offsets(text, config)?
        .into_iter()
        .map(|(_, content)| content)
        .collect())
}

/// Split `text` into overlapping windows, keeping each window's offsets.
///
/// Offsets count characters, not bytes, so multi-byte text is never cut in
/// the middle of a character. The window that reaches the end of the text is
/// the last one emitted; it may be shorter than `chunk_size`.
#[inline]
pub fn chunk_with_offsets(text: &str, config: &ChunkingConfig) -> Result<Vec<(ChunkSpan, String)>> {
    let stride = config.stride()?;
    let characters = text.chars().collect::<Vec<_>>();
    let total = characters.len();

    let mut chunks = Vec::with_capacity(total.div_ceil(stride));
    let mut start = 0;

    while start < total {
        let end = (start + config.chunk_size).min(total);
        let content = characters[start..end].iter().collect::<String>();
        chunks.push((ChunkSpan { start, end }, content));

        if end == total {
            break;
        }
        start += stride;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

/// Number of chunks `chunk_text` produces for a text of `length` characters.
#[inline]
pub fn expected_chunk_count(length: usize, config: &ChunkingConfig) -> Result<usize> {
    let stride = config.stride()?;
    Ok(match length {
        0 => 0,
        length if length <= config.chunk_size => 1,
        length => (length - config.overlap).div_ceil(stride),
    })
}
