// Knowledge base storage module
// Chunk text, build manifest, and the pairing between them and the vector index

pub mod consistency;

#[cfg(test)]
mod tests;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::ChunkingConfig;
use crate::index::{FlatIndex, VectorIndex, VectorMatrix, write_vectors};
use crate::retrieval::Retriever;
use crate::utilities::write_atomically;
use crate::{RagError, Result};

pub use consistency::{ConsistencyReport, check_consistency};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const VECTORS_FILE: &str = "embeddings.npy";
pub const INDEX_FILE: &str = "index.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Locations of every artifact produced by one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub chunks: PathBuf,
    pub vectors: PathBuf,
    pub index: PathBuf,
    pub manifest: PathBuf,
}

impl StorePaths {
    #[inline]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            chunks: dir.join(CHUNKS_FILE),
            vectors: dir.join(VECTORS_FILE),
            index: dir.join(INDEX_FILE),
            manifest: dir.join(MANIFEST_FILE),
        }
    }

    /// Whether an index has been persisted yet
    #[inline]
    pub fn has_index(&self) -> bool {
        self.index.is_file()
    }
}

/// Ordered chunk text, serialized as `{"chunks": [...]}`.
///
/// A chunk's position in this list is the row of its vector in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStore {
    chunks: Vec<String>,
}

impl ChunkStore {
    #[inline]
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.chunks.get(position).map(String::as_str)
    }

    #[inline]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Write the store as pretty-printed JSON with four-space indentation
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;

        write_atomically(path, &buffer)?;
        debug!("Saved {} chunks to {}", self.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&content)?;
        debug!("Loaded {} chunks from {}", store.len(), path.display());
        Ok(store)
    }
}

/// Metadata written alongside each build, tying the chunk store to its index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Shared with the index header
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    pub dimension: usize,
    /// Embedding model that produced the vectors; queries must use the same one
    pub embedding_model: String,
    pub chunking: ChunkingConfig,
    /// Documents the chunks were extracted from, in processing order
    pub sources: Vec<PathBuf>,
}

impl BuildManifest {
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        write_atomically(path, &content)?;
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Chunk text and vector index bundled together, guaranteed to line up.
///
/// Every constructor checks that the index holds exactly one vector per chunk
/// and that both halves come from the same build, so a knowledge base can
/// never hand out text for the wrong vector.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    chunks: ChunkStore,
    index: FlatIndex,
    manifest: BuildManifest,
}

impl KnowledgeBase {
    /// Pair `chunks` with `index`, failing with `StoreIndexMismatch` if they disagree
    #[inline]
    pub fn new(chunks: ChunkStore, index: FlatIndex, manifest: BuildManifest) -> Result<Self> {
        if index.ntotal() != chunks.len() {
            return Err(RagError::StoreIndexMismatch(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                index.ntotal()
            )));
        }

        if manifest.chunk_count != chunks.len() {
            return Err(RagError::StoreIndexMismatch(format!(
                "manifest records {} chunks but the store holds {}",
                manifest.chunk_count,
                chunks.len()
            )));
        }

        if manifest.build_id != index.build_id() {
            return Err(RagError::StoreIndexMismatch(format!(
                "manifest belongs to build {} but the index to build {}",
                manifest.build_id,
                index.build_id()
            )));
        }

        if manifest.dimension != index.dimension() {
            return Err(RagError::StoreIndexMismatch(format!(
                "manifest records dimension {} but the index has {}",
                manifest.dimension,
                index.dimension()
            )));
        }

        Ok(Self {
            chunks,
            index,
            manifest,
        })
    }

    /// Load a persisted knowledge base.
    ///
    /// The index is read first so that a missing build surfaces as
    /// `IndexNotFound`; a missing chunk store or manifest next to an existing
    /// index is a broken pair and surfaces as `StoreIndexMismatch`.
    #[inline]
    pub fn load(paths: &StorePaths) -> Result<Self> {
        let index = FlatIndex::restore(&paths.index)?;

        let chunks = ChunkStore::load(&paths.chunks).map_err(|e| missing_half(e, &paths.chunks))?;
        let manifest =
            BuildManifest::load(&paths.manifest).map_err(|e| missing_half(e, &paths.manifest))?;

        let knowledge_base = Self::new(chunks, index, manifest)?;
        info!(
            "Loaded knowledge base {} ({} chunks, dimension {})",
            knowledge_base.manifest.build_id,
            knowledge_base.chunks.len(),
            knowledge_base.index.dimension()
        );
        Ok(knowledge_base)
    }

    /// Persist chunk store, index, and manifest.
    ///
    /// The index is written last, so an interrupted save never leaves a new
    /// index next to stale chunk text.
    #[inline]
    pub fn save(&self, paths: &StorePaths) -> Result<()> {
        self.write_build(paths, None)
    }

    /// Persist the build together with its raw embedding matrix.
    ///
    /// The matrix is written before the index, so a failed matrix write
    /// leaves no index behind.
    #[inline]
    pub fn save_with_vectors(&self, paths: &StorePaths, vectors: &VectorMatrix) -> Result<()> {
        if vectors.rows() != self.chunks.len() {
            return Err(RagError::StoreIndexMismatch(format!(
                "{} chunks but {} embedding rows",
                self.chunks.len(),
                vectors.rows()
            )));
        }
        self.write_build(paths, Some(vectors))
    }

    fn write_build(&self, paths: &StorePaths, vectors: Option<&VectorMatrix>) -> Result<()> {
        if paths.index.exists() {
            warn!(
                "Replacing existing knowledge base at {}",
                paths.index.display()
            );
            fs::remove_file(&paths.index)?;
        }

        self.chunks.save(&paths.chunks)?;
        self.manifest.save(&paths.manifest)?;
        if let Some(vectors) = vectors {
            write_vectors(&paths.vectors, vectors)?;
        }
        self.index.persist(&paths.index)?;

        info!(
            "Saved knowledge base {} with {} chunks",
            self.manifest.build_id,
            self.chunks.len()
        );
        Ok(())
    }

    #[inline]
    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn manifest(&self) -> &BuildManifest {
        &self.manifest
    }

    /// Retriever over this knowledge base
    #[inline]
    pub fn retriever(&self) -> Result<Retriever<'_, FlatIndex>> {
        Retriever::new(&self.index, &self.chunks)
    }
}

fn missing_half(error: RagError, path: &Path) -> RagError {
    match error {
        RagError::Io(e) if e.kind() == ErrorKind::NotFound => RagError::StoreIndexMismatch(
            format!("index exists but {} is missing", path.display()),
        ),
        other => other,
    }
}
