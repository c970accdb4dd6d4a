// ============================================================================
// File: src/search_client.rs
// SerpApi Google Shopping client
// ============================================================================

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{Config, MAX_RESULTS_CAP};
use crate::conversation::Credential;
use crate::error::ShopError;
use crate::models::{ProductRecord, SerpApiResponse};

/// Placeholder values that mean "the user never entered a key"
const PLACEHOLDER_KEYS: [&str; 2] = ["YOUR_SERPAPI_KEY_HERE", "Your SerpAPI Key here!"];

/// SerpApi reports an empty result set through its `error` field
const NO_RESULTS_PREFIX: &str = "Google hasn't returned any results";

pub struct SearchClient {
    client: Client,
    url: String,
    engine: String,
    location: String,
    country: String,
    language: String,
    max_results: usize,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<Self, ShopError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ShopError::SearchProvider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.search_url.clone(),
            engine: config.search_engine.clone(),
            location: config.location.clone(),
            country: config.country.clone(),
            language: config.language.clone(),
            max_results: config.max_results.clamp(1, MAX_RESULTS_CAP),
        })
    }

    /// Search for `query` and return at most `max_results` products in
    /// provider order. `Ok(vec![])` means the provider found nothing.
    pub async fn search(
        &self,
        query: &str,
        credential: &Credential,
    ) -> Result<Vec<ProductRecord>, ShopError> {
        let api_key = usable_key(credential).ok_or(ShopError::MissingCredential)?;

        let num = self.max_results.to_string();
        let params = [
            ("engine", self.engine.as_str()),
            ("q", query),
            ("api_key", api_key),
            ("location", self.location.as_str()),
            ("gl", self.country.as_str()),
            ("hl", self.language.as_str()),
            ("num", num.as_str()),
        ];

        debug!(%query, engine = %self.engine, gl = %self.country, "searching products");

        let http_response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which carries the key
                let e = e.without_url();
                warn!(error = %e, "search request failed");
                ShopError::SearchProvider(e.to_string())
            })?;

        let status = http_response.status();
        let response_text = http_response
            .text()
            .await
            .map_err(|e| ShopError::SearchProvider(e.without_url().to_string()))?;

        let response: Option<SerpApiResponse> = serde_json::from_str(&response_text).ok();

        // SerpApi puts a readable message in `error` even on 4xx responses
        if let Some(message) = response.as_ref().and_then(SerpApiResponse::error_message) {
            if message.starts_with(NO_RESULTS_PREFIX) {
                debug!(%query, "provider found no results");
                return Ok(Vec::new());
            }
            warn!(%status, error = %message, "search provider reported an error");
            return Err(ShopError::SearchProvider(message.to_string()));
        }

        if !status.is_success() {
            warn!(%status, "search provider returned an error status");
            return Err(ShopError::SearchProvider(format!(
                "HTTP {}: {}",
                status,
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response = response.ok_or_else(|| {
            ShopError::SearchProvider(format!(
                "failed to parse search response: {}",
                response_text.chars().take(200).collect::<String>()
            ))
        })?;

        let products: Vec<ProductRecord> = response
            .into_results()
            .into_iter()
            .take(self.max_results)
            .map(ProductRecord::from_raw)
            .collect();

        debug!(count = products.len(), "search complete");
        Ok(products)
    }
}

fn usable_key(credential: &Credential) -> Option<&str> {
    let key = credential.expose().trim();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key) {
        None
    } else {
        Some(key)
    }
}
