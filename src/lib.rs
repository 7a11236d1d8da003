use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Generation model unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Chunk store and vector index are out of sync: {0}")]
    StoreIndexMismatch(String),

    #[error("No index found at {}; process some documents first", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Corrupt index file: {0}")]
    CorruptIndex(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extraction;
pub mod generation;
pub mod index;
pub mod ollama;
pub mod pipeline;
pub mod retrieval;
pub mod store;
mod utilities;
