// ============================================================================
// File: src/models.rs
// API request/response models and the normalized chat data model
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display titles longer than this many characters are cut and get "..."
pub const TITLE_DISPLAY_CHARS: usize = 50;

// ----------------------------------------------------------------------------
// Language model wire format (OpenAI-compatible)
// ----------------------------------------------------------------------------

/// Message structure sent to the completion endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Omitted entirely when the caller wants the server's default sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response body from `/chat/completions`
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Individual response choice
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// Message in API response
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

// ----------------------------------------------------------------------------
// SerpApi wire format
// ----------------------------------------------------------------------------

/// Response from the SerpApi search endpoint. Both fields stay untyped so
/// a null, missing or odd-shaped value never fails the whole response.
#[derive(Debug, Deserialize)]
pub struct SerpApiResponse {
    #[serde(default)]
    pub shopping_results: Option<Value>,

    /// Set by SerpApi for quota, key and "no results" conditions
    #[serde(default)]
    pub error: Option<Value>,
}

impl SerpApiResponse {
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Result entries in provider order; entries that are not objects are
    /// skipped.
    pub fn into_results(self) -> Vec<RawShoppingResult> {
        match self.shopping_results {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<RawShoppingResult>(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One shopping result exactly as the provider sent it. Nothing is
/// guaranteed, so every field is kept as an untyped JSON value until
/// [`ProductRecord::from_raw`] normalizes it.
#[derive(Debug, Deserialize, Default)]
pub struct RawShoppingResult {
    pub title: Option<Value>,
    pub price: Option<Value>,
    pub rating: Option<Value>,
    pub source: Option<Value>,
    pub thumbnail: Option<Value>,
    pub link: Option<Value>,
    pub product_link: Option<Value>,
}

// ----------------------------------------------------------------------------
// Normalized data model
// ----------------------------------------------------------------------------

/// Product rating; SerpApi usually sends a number but strings do occur
#[derive(Debug, Clone, PartialEq)]
pub enum Rating {
    Score(f64),
    Text(String),
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Score(score) if score.fract() == 0.0 => write!(f, "{:.1}", score),
            Rating::Score(score) => write!(f, "{}", score),
            Rating::Text(text) => f.write_str(text),
        }
    }
}

/// A read-only projection of one search result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductRecord {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<Rating>,
    pub source: Option<String>,
    pub thumbnail: Option<String>,
    pub link: Option<String>,
}

impl ProductRecord {
    pub fn from_raw(raw: RawShoppingResult) -> Self {
        let rating = match raw.rating {
            Some(Value::Number(n)) => n.as_f64().map(Rating::Score),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(Rating::Text(s)),
            _ => None,
        };

        Self {
            title: text(raw.title),
            price: text(raw.price),
            rating,
            source: text(raw.source),
            thumbnail: text(raw.thumbnail),
            link: text(raw.link).or_else(|| text(raw.product_link)),
        }
    }

    /// Title cut to [`TITLE_DISPLAY_CHARS`] characters plus "..." when longer.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => truncate_title(title),
            None => "No Title".to_string(),
        }
    }

    pub fn display_price(&self) -> &str {
        self.price.as_deref().unwrap_or("N/A")
    }

    pub fn display_rating(&self) -> String {
        self.rating
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn display_source(&self) -> &str {
        self.source.as_deref().unwrap_or("Unknown Store")
    }

    pub fn display_link(&self) -> &str {
        self.link.as_deref().unwrap_or("#")
    }
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_DISPLAY_CHARS {
        let cut: String = title.chars().take(TITLE_DISPLAY_CHARS).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

/// Strings pass through, numbers are stringified, anything else is dropped.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    role: Role,
    content: String,
    products: Option<Vec<ProductRecord>>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            products: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            products: None,
        }
    }

    /// Assistant turn carrying search results. An empty list is stored as
    /// no products at all.
    pub fn with_products(content: impl Into<String>, products: Vec<ProductRecord>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            products: if products.is_empty() { None } else { Some(products) },
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn products(&self) -> Option<&[ProductRecord]> {
        self.products.as_deref()
    }
}
