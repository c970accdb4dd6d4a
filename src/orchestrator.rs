// ============================================================================
// File: src/orchestrator.rs
// One user utterance in, at most one assistant turn out
// ============================================================================

use tracing::{info, warn};

use crate::config::Config;
use crate::conversation::{ConversationState, Credential};
use crate::error::ShopError;
use crate::llm_client::LlmClient;
use crate::models::ChatTurn;
use crate::router::{Router, RouterDecision};
use crate::search_client::SearchClient;

pub const NO_PRODUCTS_MESSAGE: &str = "I couldn't find any products.";

/// Where a turn currently is, reported to the caller as it moves along
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    Routing,
    DirectChat,
    Searching { keywords: String },
    Appended,
}

/// What the turn appended to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Chat,
    Products { count: usize },
    NoProducts,
}

pub struct TurnOrchestrator {
    router: Router,
    search_client: SearchClient,
    session: ConversationState,
}

impl TurnOrchestrator {
    pub fn new(config: &Config) -> Result<Self, ShopError> {
        Ok(Self::from_parts(
            Router::new(LlmClient::new(config)?),
            SearchClient::new(config)?,
        ))
    }

    pub fn from_parts(router: Router, search_client: SearchClient) -> Self {
        Self {
            router,
            search_client,
            session: ConversationState::new(),
        }
    }

    pub fn session(&self) -> &ConversationState {
        &self.session
    }

    pub fn set_api_key(&mut self, key: Credential) {
        self.session.set_api_key(key);
    }

    pub fn clear(&mut self) {
        self.session.clear();
        info!("conversation cleared");
    }

    pub async fn handle_turn(&mut self, utterance: &str) -> Result<TurnOutcome, ShopError> {
        self.handle_turn_with(utterance, |_| {}).await
    }

    /// Run one turn, calling `on_phase` at every transition.
    ///
    /// The user turn is always appended. On error nothing else is, and the
    /// error is handed back for the caller to show.
    pub async fn handle_turn_with<F>(
        &mut self,
        utterance: &str,
        mut on_phase: F,
    ) -> Result<TurnOutcome, ShopError>
    where
        F: FnMut(&TurnPhase),
    {
        self.session.append(ChatTurn::user(utterance));

        let result = self.respond(utterance, &mut on_phase).await;
        match result {
            Ok((turn, outcome)) => {
                self.session.append(turn);
                on_phase(&TurnPhase::Appended);
                info!(?outcome, turns = self.session.len(), "turn complete");
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "turn aborted");
                Err(e)
            }
        }
    }

    async fn respond<F>(
        &self,
        utterance: &str,
        on_phase: &mut F,
    ) -> Result<(ChatTurn, TurnOutcome), ShopError>
    where
        F: FnMut(&TurnPhase),
    {
        on_phase(&TurnPhase::Routing);

        match self.router.classify(utterance).await? {
            RouterDecision::NoSearch => {
                on_phase(&TurnPhase::DirectChat);
                let reply = self.router.complete_chat(utterance).await?;
                Ok((ChatTurn::assistant(reply), TurnOutcome::Chat))
            }
            RouterDecision::Search { keywords } => {
                on_phase(&TurnPhase::Searching {
                    keywords: keywords.clone(),
                });
                let products = self
                    .search_client
                    .search(&keywords, self.session.api_key())
                    .await?;

                if products.is_empty() {
                    return Ok((ChatTurn::assistant(NO_PRODUCTS_MESSAGE), TurnOutcome::NoProducts));
                }

                let count = products.len();
                Ok((
                    ChatTurn::with_products(summary(count), products),
                    TurnOutcome::Products { count },
                ))
            }
        }
    }
}

pub fn summary(count: usize) -> String {
    format!("I found **{}** options for you:", count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GREETING;
    use crate::models::Role;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        llm: MockServer,
        serp: MockServer,
        orchestrator: TurnOrchestrator,
    }

    async fn harness() -> Harness {
        let llm = MockServer::start().await;
        let serp = MockServer::start().await;
        let config = Config {
            llm_base_url: llm.uri(),
            search_url: format!("{}/search.json", serp.uri()),
            ..Config::default()
        };
        let mut orchestrator = TurnOrchestrator::new(&config).unwrap();
        orchestrator.set_api_key(Credential::new("serp-key"));
        Harness {
            llm,
            serp,
            orchestrator,
        }
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    async fn mount_router_reply(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "temperature": 0.0 })))
            .respond_with(completion(reply))
            .expect(1)
            .mount(server)
            .await;
    }

    fn shopping_results(count: usize) -> Value {
        let items: Vec<Value> = (1..=count)
            .map(|i| {
                json!({
                    "title": format!("Headphones {}", i),
                    "price": format!("${}", 20 + i),
                    "rating": 4.0 + (i as f64) / 10.0,
                    "source": "Best Buy",
                    "link": format!("https://shop.example/{}", i)
                })
            })
            .collect();
        json!({ "shopping_results": items })
    }

    #[tokio::test]
    async fn test_search_turn_appends_products() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "best headphones under $50").await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "best headphones under $50"))
            .and(query_param("api_key", "serp-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(6)))
            .expect(1)
            .mount(&h.serp)
            .await;

        let mut phases = Vec::new();
        let outcome = h
            .orchestrator
            .handle_turn_with("best headphones under $50", |p| phases.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Products { count: 6 });
        assert_eq!(
            phases,
            vec![
                TurnPhase::Routing,
                TurnPhase::Searching {
                    keywords: "best headphones under $50".to_string()
                },
                TurnPhase::Appended,
            ]
        );

        let turns = h.orchestrator.session().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role(), Role::User);
        assert_eq!(turns[1].content(), "best headphones under $50");

        let reply = &turns[2];
        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "I found **6** options for you:");
        let products = reply.products().unwrap();
        assert_eq!(products.len(), 6);
        let titles: Vec<&str> = products.iter().filter_map(|p| p.title.as_deref()).collect();
        assert_eq!(
            titles,
            vec![
                "Headphones 1",
                "Headphones 2",
                "Headphones 3",
                "Headphones 4",
                "Headphones 5",
                "Headphones 6"
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_turn_appends_reply_verbatim() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "NO_SEARCH").await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(completion("Hello! How can I help you shop today?"))
            .expect(1)
            .mount(&h.llm)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(1)))
            .expect(0)
            .mount(&h.serp)
            .await;

        let mut phases = Vec::new();
        let outcome = h
            .orchestrator
            .handle_turn_with("hello", |p| phases.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Chat);
        assert_eq!(
            phases,
            vec![TurnPhase::Routing, TurnPhase::DirectChat, TurnPhase::Appended]
        );
        let last = h.orchestrator.session().last().unwrap();
        assert_eq!(last.role(), Role::Assistant);
        assert_eq!(last.content(), "Hello! How can I help you shop today?");
        assert!(last.products().is_none());
        assert_eq!(h.orchestrator.session().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_router_reply_falls_back_to_chat() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "  \n").await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(completion("hi there"))
            .expect(1)
            .mount(&h.llm)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(1)))
            .expect(0)
            .mount(&h.serp)
            .await;

        let outcome = h.orchestrator.handle_turn("hello").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Chat);
        assert_eq!(h.orchestrator.session().len(), 3);
        let last = h.orchestrator.session().last().unwrap();
        assert_eq!(last.content(), "hi there");
        assert!(last.products().is_none());
    }

    #[tokio::test]
    async fn test_chat_failure_after_routing_appends_only_user_turn() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "NO_SEARCH").await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&h.llm)
            .await;

        let mut phases = Vec::new();
        let err = h
            .orchestrator
            .handle_turn_with("hello", |p| phases.push(p.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::ModelUnavailable(_)));
        assert_eq!(phases, vec![TurnPhase::Routing, TurnPhase::DirectChat]);
        let turns = h.orchestrator.session().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role(), Role::User);
        assert_eq!(turns[1].content(), "hello");
    }

    #[tokio::test]
    async fn test_empty_search_appends_fixed_message() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "purple unicorn toaster").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&h.serp)
            .await;

        let outcome = h
            .orchestrator
            .handle_turn("purple unicorn toaster")
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::NoProducts);
        let last = h.orchestrator.session().last().unwrap();
        assert_eq!(last.content(), NO_PRODUCTS_MESSAGE);
        assert!(last.products().is_none());
    }

    #[tokio::test]
    async fn test_null_results_appends_fixed_message() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "vintage typewriter").await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "shopping_results": null })),
            )
            .mount(&h.serp)
            .await;

        let outcome = h.orchestrator.handle_turn("vintage typewriter").await.unwrap();

        assert_eq!(outcome, TurnOutcome::NoProducts);
        assert_eq!(h.orchestrator.session().len(), 3);
        assert_eq!(
            h.orchestrator.session().last().unwrap().content(),
            NO_PRODUCTS_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_model_failure_appends_only_user_turn() {
        let mut h = harness().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&h.llm)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(1)))
            .expect(0)
            .mount(&h.serp)
            .await;

        let err = h.orchestrator.handle_turn("hello").await.unwrap_err();
        assert!(matches!(err, ShopError::ModelUnavailable(_)));

        let turns = h.orchestrator.session().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role(), Role::User);
    }

    #[tokio::test]
    async fn test_search_failure_appends_only_user_turn() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "gaming mouse").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": "Your account has run out of searches."
            })))
            .mount(&h.serp)
            .await;

        let err = h.orchestrator.handle_turn("gaming mouse").await.unwrap_err();
        assert!(matches!(err, ShopError::SearchProvider(_)));
        assert_eq!(h.orchestrator.session().len(), 2);
        assert_eq!(h.orchestrator.session().last().unwrap().role(), Role::User);
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits_search() {
        let mut h = harness().await;
        h.orchestrator.set_api_key(Credential::default());
        mount_router_reply(&h.llm, "gaming mouse").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(1)))
            .expect(0)
            .mount(&h.serp)
            .await;

        let err = h.orchestrator.handle_turn("gaming mouse").await.unwrap_err();
        assert!(matches!(err, ShopError::MissingCredential));
        assert_eq!(h.orchestrator.session().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_after_turns_restores_greeting() {
        let mut h = harness().await;
        mount_router_reply(&h.llm, "usb c cable").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(shopping_results(2)))
            .mount(&h.serp)
            .await;

        h.orchestrator.handle_turn("usb c cable").await.unwrap();
        assert_eq!(h.orchestrator.session().len(), 3);

        h.orchestrator.clear();
        h.orchestrator.clear();
        let turns = h.orchestrator.session().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content(), GREETING);
        assert!(turns[0].products().is_none());
    }

    #[test]
    fn test_summary_text() {
        assert_eq!(summary(6), "I found **6** options for you:");
        assert_eq!(summary(1), "I found **1** options for you:");
    }
}
