// ============================================================================
// File: src/router.rs
// Decides whether an utterance is a product search or plain chat
// ============================================================================

use tracing::{debug, info};

use crate::error::ShopError;
use crate::llm_client::LlmClient;
use crate::models::Message;

/// Literal the model is told to answer with for non-product messages
pub const NO_SEARCH_TOKEN: &str = "NO_SEARCH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    NoSearch,
    Search { keywords: String },
}

pub struct Router {
    llm: LlmClient,
}

impl Router {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Ask the model, at temperature 0, whether `utterance` wants products.
    pub async fn classify(&self, utterance: &str) -> Result<RouterDecision, ShopError> {
        let reply = self
            .llm
            .complete(vec![Message::user(routing_prompt(utterance))], Some(0.0))
            .await?;
        debug!(raw_reply = %reply, "router reply");

        let decision = parse_decision(&reply);
        info!(?decision, "routed utterance");
        Ok(decision)
    }

    /// Plain chat completion with the raw utterance and default sampling.
    pub async fn complete_chat(&self, utterance: &str) -> Result<String, ShopError> {
        let reply = self
            .llm
            .complete(vec![Message::user(utterance)], None)
            .await?;

        // Nothing to show the user, so treat it like any other model failure
        if reply.trim().is_empty() {
            return Err(ShopError::ModelUnavailable(
                "model returned no content".to_string(),
            ));
        }
        Ok(reply)
    }
}

pub fn routing_prompt(utterance: &str) -> String {
    format!(
        "User Input: '{}'. If asking for a product, reply with ONLY the search keywords. If chat, reply '{}'.",
        utterance, NO_SEARCH_TOKEN
    )
}

/// Any reply mentioning the token is chat, even if it also holds keywords.
pub fn parse_decision(reply: &str) -> RouterDecision {
    let trimmed = reply.trim().trim_matches('"').trim();

    if trimmed.is_empty() || trimmed.contains(NO_SEARCH_TOKEN) {
        RouterDecision::NoSearch
    } else {
        RouterDecision::Search {
            keywords: trimmed.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search(keywords: &str) -> RouterDecision {
        RouterDecision::Search {
            keywords: keywords.to_string(),
        }
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    fn router_for(server: &MockServer) -> Router {
        let config = Config {
            llm_base_url: server.uri(),
            ..Config::default()
        };
        Router::new(LlmClient::new(&config).unwrap())
    }

    #[test]
    fn test_parse_no_search() {
        assert_eq!(parse_decision("NO_SEARCH"), RouterDecision::NoSearch);
        assert_eq!(parse_decision("  \"NO_SEARCH\"\n"), RouterDecision::NoSearch);
        assert_eq!(
            parse_decision("This is small talk, so NO_SEARCH."),
            RouterDecision::NoSearch
        );
    }

    #[test]
    fn test_parse_keywords_verbatim() {
        assert_eq!(
            parse_decision("best headphones under $50"),
            search("best headphones under $50")
        );
        assert_eq!(
            parse_decision("\"red running shoes\"\n"),
            search("red running shoes")
        );
        assert_eq!(
            parse_decision("  mechanical keyboard  "),
            search("mechanical keyboard")
        );
    }

    #[test]
    fn test_parse_keeps_inner_quotes() {
        assert_eq!(
            parse_decision("\"27\" monitor\""),
            search("27\" monitor")
        );
    }

    #[test]
    fn test_parse_empty_reply_is_chat() {
        assert_eq!(parse_decision("\"\""), RouterDecision::NoSearch);
        assert_eq!(parse_decision("   "), RouterDecision::NoSearch);
    }

    #[test]
    fn test_routing_prompt_embeds_utterance() {
        assert_eq!(
            routing_prompt("hello"),
            "User Input: 'hello'. If asking for a product, reply with ONLY the search keywords. If chat, reply 'NO_SEARCH'."
        );
    }

    #[tokio::test]
    async fn test_classify_sends_deterministic_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "llama3",
                "temperature": 0.0,
                "messages": [{ "role": "user", "content": routing_prompt("red running shoes") }]
            })))
            .respond_with(completion("\"red running shoes\""))
            .expect(1)
            .mount(&server)
            .await;

        let decision = router_for(&server)
            .classify("red running shoes")
            .await
            .unwrap();
        assert_eq!(decision, search("red running shoes"));
    }

    #[tokio::test]
    async fn test_complete_chat_sends_raw_utterance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(completion("Hi there!"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = router_for(&server).complete_chat("hello").await.unwrap();
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn test_classify_blank_reply_is_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("  \n"))
            .mount(&server)
            .await;

        let decision = router_for(&server).classify("hello").await.unwrap();
        assert_eq!(decision, RouterDecision::NoSearch);
    }

    #[tokio::test]
    async fn test_complete_chat_blank_reply_is_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(""))
            .mount(&server)
            .await;

        let err = router_for(&server).complete_chat("hello").await.unwrap_err();
        assert!(matches!(err, ShopError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_classify_failure_is_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = router_for(&server).classify("hello").await.unwrap_err();
        assert!(matches!(err, ShopError::ModelUnavailable(_)));
    }
}
