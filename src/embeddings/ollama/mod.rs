
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Embedder, check_batch};
use crate::config::OllamaConfig;
use crate::ollama::OllamaClient;
use crate::{RagError, Result};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding model served by Ollama's `/api/embed`
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    /// Build the embedder and verify the server serves the configured model
    #[inline]
    pub fn connect(config: &OllamaConfig) -> Result<Self> {
        let client = OllamaClient::new(config)
            .map_err(|e| RagError::EmbeddingUnavailable(format!("{e:#}")))?;
        let embedder = Self::from_client(client, &config.model, config.batch_size as usize);

        embedder
            .client
            .health_check(&embedder.model)
            .map_err(|e| RagError::EmbeddingUnavailable(format!("{e:#}")))?;

        info!("Embedding model {} ready", embedder.model);
        Ok(embedder)
    }

    /// Wrap an existing client without contacting the server
    #[inline]
    pub fn from_client(client: OllamaClient, model: &str, batch_size: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response: EmbedResponse = self
            .client
            .post_json("/api/embed", &request)
            .map_err(|e| RagError::EmbeddingUnavailable(format!("{e:#}")))?;

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts in batches of {}",
            texts.len(),
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch)?);
        }

        check_batch(texts.len(), &vectors)?;
        debug!("Generated {} embeddings", vectors.len());
        Ok(vectors)
    }
}
