// Knowledge base consistency validation module
// Reports how the chunk store, vector matrix, manifest, and index line up


use tracing::{debug, info, warn};

use super::{BuildManifest, ChunkStore, StorePaths};
use crate::Result;
use crate::index::{FlatIndex, VectorIndex, read_vectors};

/// Consistency check results across the artifacts of one build
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsistencyReport {
    /// Number of chunks in the chunk store, if it could be read
    pub chunk_count: Option<usize>,
    /// Number of rows in the stored embedding matrix, if it could be read
    pub vector_rows: Option<usize>,
    /// Number of vectors in the index, if it could be read
    pub index_vectors: Option<usize>,
    /// Dimension of the indexed vectors
    pub index_dimension: Option<usize>,
    /// Chunk count recorded in the manifest
    pub manifest_chunk_count: Option<usize>,
    /// Embedding model recorded in the manifest
    pub embedding_model: Option<String>,
    /// Human-readable description of every problem found
    pub issues: Vec<String>,
    /// Overall consistency status
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.issues.len()
    }

    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Knowledge base is consistent: {} chunks indexed",
                self.chunk_count.unwrap_or_default()
            )
        } else {
            format!(
                "Knowledge base has {} inconsistencies found",
                self.total_issues()
            )
        }
    }
}

/// Inspect every artifact under `paths` without failing on the first problem.
///
/// Unlike [`super::KnowledgeBase::load`], which aborts on any mismatch, this
/// collects all problems so they can be shown to the user at once.
#[inline]
pub fn check_consistency(paths: &StorePaths) -> Result<ConsistencyReport> {
    info!("Starting knowledge base consistency validation");

    let mut report = ConsistencyReport::default();

    if !paths.has_index() && !paths.chunks.exists() && !paths.manifest.exists() {
        report
            .issues
            .push("no knowledge base has been built yet".to_string());
        return Ok(report);
    }

    let chunks = record(&mut report, "chunk store", ChunkStore::load(&paths.chunks));
    let index = record(&mut report, "index", FlatIndex::restore(&paths.index));
    let manifest = record(&mut report, "manifest", BuildManifest::load(&paths.manifest));

    report.chunk_count = chunks.as_ref().map(ChunkStore::len);
    report.index_vectors = index.as_ref().map(FlatIndex::ntotal);
    report.index_dimension = index.as_ref().map(FlatIndex::dimension);
    report.manifest_chunk_count = manifest.as_ref().map(|m| m.chunk_count);
    report.embedding_model = manifest.as_ref().map(|m| m.embedding_model.clone());

    if paths.vectors.exists() {
        report.vector_rows = record(&mut report, "embedding matrix", read_vectors(&paths.vectors))
            .map(|matrix| matrix.rows());
    }
    debug!(
        "Found {:?} chunks, {:?} indexed vectors, {:?} stored vectors",
        report.chunk_count, report.index_vectors, report.vector_rows
    );

    if let (Some(chunks), Some(vectors)) = (report.chunk_count, report.index_vectors) {
        if chunks != vectors {
            report.issues.push(format!(
                "chunk store holds {} chunks but index holds {} vectors",
                chunks, vectors
            ));
        }
    }

    if let (Some(chunks), Some(rows)) = (report.chunk_count, report.vector_rows) {
        if chunks != rows {
            report.issues.push(format!(
                "chunk store holds {} chunks but embedding matrix has {} rows",
                chunks, rows
            ));
        }
    }

    if let (Some(chunks), Some(recorded)) = (report.chunk_count, report.manifest_chunk_count) {
        if chunks != recorded {
            report.issues.push(format!(
                "manifest records {} chunks but chunk store holds {}",
                recorded, chunks
            ));
        }
    }

    if let (Some(index), Some(manifest)) = (&index, &manifest) {
        if index.build_id() != manifest.build_id {
            report.issues.push(format!(
                "index belongs to build {} but manifest to build {}",
                index.build_id(),
                manifest.build_id
            ));
        }
        if index.dimension() != manifest.dimension {
            report.issues.push(format!(
                "index dimension {} differs from manifest dimension {}",
                index.dimension(),
                manifest.dimension
            ));
        }
    }

    report.is_consistent = report.issues.is_empty();

    if report.is_consistent {
        info!("Knowledge base consistency validation passed");
    } else {
        warn!("Knowledge base consistency validation found issues");
        for issue in &report.issues {
            warn!("  {}", issue);
        }
    }

    Ok(report)
}

fn record<T>(report: &mut ConsistencyReport, what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            report.issues.push(format!("{} unreadable: {}", what, e));
            None
        }
    }
}
