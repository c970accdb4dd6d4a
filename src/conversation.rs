// ============================================================================
// File: src/conversation.rs
// Per-session conversation log and search credential
// ============================================================================

use crate::models::ChatTurn;

/// First assistant line of every fresh or cleared session
pub const GREETING: &str = "Hi! What are you looking to buy today?";

/// SerpApi key entered by the user. Debug output never shows the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_set(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_set() {
            f.write_str("Credential(<redacted>)")
        } else {
            f.write_str("Credential(<unset>)")
        }
    }
}

/// Everything one chat session owns. Turns are kept in the order they
/// happened and are only ever appended, or dropped all at once by `clear`.
#[derive(Debug)]
pub struct ConversationState {
    turns: Vec<ChatTurn>,
    api_key: Credential,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            turns: vec![ChatTurn::assistant(GREETING)],
            api_key: Credential::default(),
        }
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Back to the seeded greeting. The credential survives a clear.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.turns.push(ChatTurn::assistant(GREETING));
    }

    pub fn api_key(&self) -> &Credential {
        &self.api_key
    }

    pub fn set_api_key(&mut self, key: Credential) {
        self.api_key = key;
    }
}
