// ============================================================================
// File: src/config.rs
// Configuration structures and validation
// ============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure, optionally loaded from a JSON file.
///
/// Every field has a default so a partial file (or no file at all) works.
/// The SerpApi key is deliberately absent: it is entered at runtime.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of an OpenAI-compatible API (e.g., a local Ollama server)
    pub llm_base_url: String,

    /// Bearer token for the language model API
    pub llm_api_key: String,

    /// Model identifier used for both routing and chat
    pub model: String,

    /// Full URL of the SerpApi search endpoint
    pub search_url: String,

    /// SerpApi engine selector
    pub search_engine: String,

    /// Location sent with every search
    pub location: String,

    /// Country code (`gl`)
    pub country: String,

    /// Interface language (`hl`)
    pub language: String,

    /// Maximum number of products per search (1-6)
    pub max_results: usize,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,

    /// Number of product cards per grid row
    pub grid_columns: usize,
}

/// Upper bound on products per search; six fills a 3x2 grid.
pub const MAX_RESULTS_CAP: usize = 6;

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_base_url: "http://localhost:11434/v1".to_string(),
            llm_api_key: "ollama".to_string(),
            model: "llama3".to_string(),
            search_url: "https://serpapi.com/search.json".to_string(),
            search_engine: "google_shopping".to_string(),
            location: "India".to_string(),
            country: "in".to_string(),
            language: "en".to_string(),
            max_results: MAX_RESULTS_CAP,
            request_timeout_secs: 30,
            grid_columns: 3,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("llm_base_url is required"));
        }

        if self.model.trim().is_empty() {
            return Err(anyhow::anyhow!("model is required"));
        }

        if self.search_url.trim().is_empty() {
            return Err(anyhow::anyhow!("search_url is required"));
        }

        if self.max_results == 0 || self.max_results > MAX_RESULTS_CAP {
            return Err(anyhow::anyhow!(
                "max_results must be between 1 and {}",
                MAX_RESULTS_CAP
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be positive"));
        }

        if self.grid_columns == 0 {
            return Err(anyhow::anyhow!("grid_columns must be at least 1"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
