// Answer synthesis module
// Builds the prompt from retrieved chunks and asks a generative model to answer


use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GenerationConfig, OllamaConfig};
use crate::ollama::OllamaClient;
use crate::retrieval::RetrievedChunk;
use crate::{RagError, Result};

/// Separator placed between retrieved chunks in the context
pub const CONTEXT_SEPARATOR: &str = " ";

/// A generative language model that answers a question from context
pub trait Generator: Send + Sync {
    fn generate(&self, query: &str, context: &str) -> Result<String>;
}

/// Prompt sent to the model for `query` over `context`
#[inline]
pub fn build_prompt(query: &str, context: &str) -> String {
    format!("Context: {context}\nQuestion: {query}\nAnswer:")
}

/// Join retrieved chunk texts in rank order
#[inline]
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).join(CONTEXT_SEPARATOR)
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generative model served by Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
    max_output_tokens: u32,
}

impl OllamaGenerator {
    /// Build the generator and verify the server serves the configured model
    #[inline]
    pub fn connect(ollama: &OllamaConfig, generation: &GenerationConfig) -> Result<Self> {
        let client = OllamaClient::new(ollama)
            .map_err(|e| RagError::GenerationUnavailable(format!("{e:#}")))?;
        let generator = Self::from_client(client, generation);

        generator
            .client
            .health_check(&generator.model)
            .map_err(|e| RagError::GenerationUnavailable(format!("{e:#}")))?;

        info!("Generation model {} ready", generator.model);
        Ok(generator)
    }

    #[inline]
    pub fn from_client(client: OllamaClient, generation: &GenerationConfig) -> Self {
        Self {
            client,
            model: generation.model.clone(),
            max_output_tokens: generation.max_output_tokens,
        }
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for OllamaGenerator {
    #[inline]
    fn generate(&self, query: &str, context: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(query, context),
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_output_tokens,
            },
        };

        debug!(
            "Generating answer with {} ({} context chars)",
            self.model,
            context.chars().count()
        );

        let response: GenerateResponse = self
            .client
            .post_json("/api/generate", &request)
            .map_err(|e| RagError::GenerationUnavailable(format!("{e:#}")))?;

        Ok(response.response.trim().to_string())
    }
}
