// ============================================================================
// File: src/error.rs
// Error taxonomy for a single chat turn
// ============================================================================

use thiserror::Error;

/// Failures that end the current turn. None of them are retried and none of
/// them take the session down; the REPL turns each one into a visible notice.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("no SerpApi key set, use /key to enter one")]
    MissingCredential,

    #[error("search error: {0}")]
    SearchProvider(String),

    #[error("language model unavailable: {0}")]
    ModelUnavailable(String),
}
