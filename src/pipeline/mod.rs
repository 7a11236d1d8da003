// Pipeline module
// Coordinates extraction, chunking, embedding, and indexing into a knowledge base,
// and answers questions against a stored one


use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::chunk_text;
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::extraction::extract_document;
use crate::generation::{Generator, build_context};
use crate::index::{FlatIndex, VectorIndex, VectorMatrix};
use crate::retrieval::RetrievedChunk;
use crate::ollama::same_model;
use crate::store::{BuildManifest, ChunkStore, KnowledgeBase, StorePaths};
use crate::{RagError, Result};

/// Separator placed between documents before chunking
pub const DOCUMENT_SEPARATOR: &str = " ";

/// Characters of each source shown alongside an answer
pub const SNIPPET_CHARS: usize = 200;

/// Summary of one knowledge base build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub build_id: Uuid,
    pub documents: usize,
    pub characters: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub elapsed: Duration,
}

/// A generated answer and the chunks it was generated from
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// Retrieved chunks, best match first
    pub sources: Vec<RetrievedChunk>,
}

impl Answer {
    /// Leading `limit` characters of each source, in rank order
    #[inline]
    pub fn snippets(&self, limit: usize) -> Vec<&str> {
        self.sources.iter().map(|s| s.snippet(limit)).collect()
    }
}

/// Store locations for `config`, or `IndexNotFound` if nothing has been built
#[inline]
pub fn require_index(config: &Config) -> Result<StorePaths> {
    let paths = config.store_paths();
    if !paths.has_index() {
        return Err(RagError::IndexNotFound(paths.index));
    }
    Ok(paths)
}

/// Build a knowledge base from `documents`, replacing any previous build
#[inline]
pub fn process_documents<E: Embedder + ?Sized>(
    config: &Config,
    embedder: &E,
    documents: &[PathBuf],
) -> Result<BuildReport> {
    if documents.is_empty() {
        return Err(RagError::InvalidConfiguration(
            "no documents to process".to_string(),
        ));
    }

    let started = Instant::now();
    info!("Processing {} documents", documents.len());

    let mut texts = Vec::with_capacity(documents.len());
    for path in documents {
        let text = extract_document(path)?;
        if text.trim().is_empty() {
            warn!("No text extracted from {}", path.display());
        }
        texts.push(text);
    }

    let text = texts.join(DOCUMENT_SEPARATOR);
    let characters = text.chars().count();
    let chunks = chunk_text(&text, &config.chunking)?;
    if chunks.is_empty() {
        return Err(RagError::ExtractionFailed(
            "no text could be extracted from the documents".to_string(),
        ));
    }
    info!(
        "Split {} characters into {} chunks",
        characters,
        chunks.len()
    );

    let vectors = embed_with_progress(embedder, &chunks)?;
    let index = FlatIndex::build(&vectors)?;

    let manifest = BuildManifest {
        build_id: index.build_id(),
        created_at: Utc::now(),
        chunk_count: chunks.len(),
        dimension: index.dimension(),
        embedding_model: embedder.model().to_string(),
        chunking: config.chunking,
        sources: documents.to_vec(),
    };

    let chunk_count = chunks.len();
    let knowledge_base = KnowledgeBase::new(ChunkStore::new(chunks), index, manifest)?;
    let matrix = VectorMatrix::from_rows(&vectors)?;
    knowledge_base.save_with_vectors(&config.store_paths(), &matrix)?;

    let report = BuildReport {
        build_id: knowledge_base.manifest().build_id,
        documents: documents.len(),
        characters,
        chunks: chunk_count,
        dimension: knowledge_base.index().dimension(),
        elapsed: started.elapsed(),
    };
    info!(
        "Built knowledge base {} in {:.2?}",
        report.build_id, report.elapsed
    );
    Ok(report)
}

fn embed_with_progress<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[String],
) -> Result<Vec<Vec<f32>>> {
    let spinner = if console::user_attended_stderr() {
        let spinner = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(format!(
        "Embedding {} chunks with {}",
        chunks.len(),
        embedder.model()
    ));

    let vectors = embedder.embed(chunks).inspect_err(|_| spinner.abandon())?;
    spinner.finish_and_clear();

    debug!("Embedded {} chunks", vectors.len());
    Ok(vectors)
}

/// Answer `question` from the knowledge base stored under `config`.
///
/// Fails with `IndexNotFound` before touching either model when nothing has
/// been processed yet, and with `StoreIndexMismatch` when `embedder` is not
/// the model the knowledge base was built with.
#[inline]
pub fn ask<E, G>(
    config: &Config,
    embedder: &E,
    generator: &G,
    question: &str,
    k: usize,
) -> Result<Answer>
where
    E: Embedder + ?Sized,
    G: Generator + ?Sized,
{
    let paths = require_index(config)?;
    let knowledge_base = KnowledgeBase::load(&paths)?;

    let built_with = &knowledge_base.manifest().embedding_model;
    if !same_model(built_with, embedder.model()) {
        return Err(RagError::StoreIndexMismatch(format!(
            "knowledge base was embedded with {} but queries use {}; process the documents again",
            built_with,
            embedder.model()
        )));
    }

    let sources = knowledge_base
        .retriever()?
        .retrieve(embedder, question, k)?;
    let context = build_context(&sources);
    let text = generator.generate(question, &context)?;

    info!(
        "Answered question using {} retrieved chunks",
        sources.len()
    );
    Ok(Answer {
        question: question.to_string(),
        text,
        sources,
    })
}
