use crate::error::{Result, VidsqlError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling settings sent with every completion request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOptions {
    pub num_predict: u32,
    pub temperature: f32,
    pub repeat_penalty: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_predict: 128,
            temperature: 0.3,
            repeat_penalty: 1.2,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    response: String,
}

#[derive(Deserialize, Debug)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize, Debug)]
struct ModelTag {
    name: String,
}

/// Client for a local completion server speaking the `/api/generate` protocol.
#[derive(Clone)]
pub struct LlmClient {
    base_url: String,
    model: String,
    options: GenerationOptions,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(base_url: String, model: String, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| VidsqlError::Generation(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            options: GenerationOptions::default(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// True when the server answers and has the configured model.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| VidsqlError::Generation(format!("LLM server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| VidsqlError::Generation(format!("Failed to parse model list: {}", e)))?;

        Ok(tags
            .models
            .iter()
            .any(|m| m.name == self.model || m.name.starts_with(&format!("{}:", self.model))))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| VidsqlError::Generation(format!("LLM API call failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VidsqlError::Generation(format!(
                "LLM API returned status {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| VidsqlError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        Ok(completion.response)
    }
}
