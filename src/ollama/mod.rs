// Ollama HTTP client module
// Shared blocking transport for the embedding and generation adapters


use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OllamaConfig;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self, model: &str) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().context("Server ping failed")?;
        Self::ensure_model_listed(model, &models).context("Model validation failed")?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, model
        );
        Ok(())
    }

    /// Validate that `model` is available on the server
    #[inline]
    pub fn validate_model(&self, model: &str) -> Result<()> {
        debug!("Validating model: {}", model);
        let models = self.list_models().context("Failed to list models")?;
        Self::ensure_model_listed(model, &models)
    }

    fn ensure_model_listed(model: &str, models: &[ModelInfo]) -> Result<()> {
        if models.iter().any(|m| model_matches(model, &m.name)) {
            debug!("Model {} is available", model);
            return Ok(());
        }

        let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        warn!(
            "Model {} not found. Available models: {:?}",
            model, available_models
        );
        Err(anyhow::anyhow!(
            "Model '{}' is not available. Available models: {:?}",
            model,
            available_models
        ))
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .send_once(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// POST `request` as JSON to `endpoint` and decode the JSON response
    pub(crate) fn post_json<Req, Resp>(&self, endpoint: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(endpoint)
            .with_context(|| format!("Failed to build URL for {}", endpoint))?;

        let request_json =
            serde_json::to_string(request).context("Failed to serialize request")?;

        let response_text = self
            .send_once(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .with_context(|| format!("Request to {} failed", endpoint))?;

        serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse response from {}", endpoint))
    }

    /// Run `request_fn` a single time; retrying is left to the caller
    fn send_once<F>(&self, request_fn: F) -> Result<String>
    where
        F: FnOnce() -> Result<String, ureq::Error>,
    {
        request_fn().map_err(|error| match error {
            ureq::Error::StatusCode(status) if status >= 500 => {
                warn!("Server error (status {}) from {}", status, self.base_url);
                anyhow::anyhow!("Server error: HTTP {}", status)
            }
            ureq::Error::StatusCode(status) => {
                warn!("Client error (status {}) from {}", status, self.base_url);
                anyhow::anyhow!("Client error: HTTP {}", status)
            }
            other => {
                error!("Request to {} failed: {}", self.base_url, other);
                anyhow::anyhow!("Request error: {}", other)
            }
        })
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Ollama lists models with an explicit tag; an untagged name means `:latest`.
pub(crate) fn model_matches(configured: &str, listed: &str) -> bool {
    configured == listed
        || (!configured.contains(':') && listed.strip_suffix(":latest") == Some(configured))
}

/// Whether two model names refer to the same Ollama model, in either tag form
pub(crate) fn same_model(a: &str, b: &str) -> bool {
    model_matches(a, b) || model_matches(b, a)
}
