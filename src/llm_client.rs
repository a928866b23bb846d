use crate::config::Config;
use crate::errors::AppError;
use crate::models::{GenerateOptions, GenerateRequest, GenerateResponse};
use std::time::Duration;

/// Timeout for a single generation call. Local models can take a while
/// on first token; anything beyond this is treated as unavailable.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

const MAX_OUTPUT_TOKENS: u32 = 256;

/// Client for a local Ollama-compatible language model endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Creates a new `OllamaClient` from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration carrying the base URL and model name.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create LLM client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.llm_base_url.clone(),
            model: config.llm_model.clone(),
        })
    }

    /// Runs a single non-streaming generation and returns the raw response text.
    ///
    /// Sampling is near-deterministic (low temperature, bounded output)
    /// since the caller wants a parseable JSON object, not prose variety.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                top_p: 0.9,
                num_predict: MAX_OUTPUT_TOKENS,
                stop: vec!["```".to_string()],
            },
        };

        tracing::debug!("Calling LLM generate: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::upstream(format!(
                "LLM returned {}: {}",
                status, error_text
            )));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to parse LLM response: {}", e)))?;

        tracing::debug!(
            "LLM generate complete: done={}, {} chars",
            data.done,
            data.response.len()
        );
        Ok(data.response)
    }

    /// Liveness probe against the model endpoint. Never errors.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("LLM health check failed: {}", e);
                false
            }
        }
    }
}
