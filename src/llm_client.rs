// ============================================================================
// File: src/llm_client.rs
// OpenAI-compatible chat completion client
// ============================================================================

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ShopError;
use crate::models::{ChatCompletionRequest, ChatCompletionResponse, Message};

pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, ShopError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ShopError::ModelUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            api_key: config.llm_api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send one completion request and return the text of the first choice,
    /// which may be blank.
    ///
    /// `temperature: None` leaves sampling to the server default. Every
    /// failure, including a timeout, surfaces as `ModelUnavailable`.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, ShopError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, ?temperature, %url, "calling language model");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "language model request failed");
                ShopError::ModelUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "language model returned an error status");
            return Err(ShopError::ModelUnavailable(format!(
                "model '{}' returned HTTP {}: {}",
                self.model,
                status,
                error_text.chars().take(200).collect::<String>()
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ShopError::ModelUnavailable(e.to_string()))?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                ShopError::ModelUnavailable(format!(
                    "failed to parse response from model '{}': {}",
                    self.model, e
                ))
            })?;

        // A blank reply is still a reply; callers decide what it means
        let choice = response_data.choices.into_iter().next().ok_or_else(|| {
            ShopError::ModelUnavailable(format!("model '{}' returned no choices", self.model))
        })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
