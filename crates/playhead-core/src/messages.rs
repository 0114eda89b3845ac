use serde::{Deserialize, Serialize};

/// Greeting every transcript starts with.
pub const WELCOME_MESSAGE: &str =
    "Hello! I can answer questions about your YouTube videos. First, ingest a video or playlist URL.";
/// Appended when a question is asked before a session exists.
pub const MISSING_SESSION_MESSAGE: &str = "Error: No session ID found. Please refresh.";
/// Appended when a chat request fails for any reason.
pub const CHAT_FAILURE_MESSAGE: &str = "Error getting response.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single entry in the conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Append-only conversation log. There is no way to edit or remove a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            turns: vec![Turn::system(WELCOME_MESSAGE)],
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns that are not user turns, welcome message included.
    pub fn response_count(&self) -> usize {
        self.turns.iter().filter(|t| !t.is_user()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_welcome_turn() {
        let transcript = Transcript::new();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0], Turn::system(WELCOME_MESSAGE));
    }

    #[test]
    fn push_appends_in_order() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.push(Turn::user("q")), 1);
        assert_eq!(transcript.push(Turn::assistant("a")), 2);
        assert_eq!(transcript.last(), Some(&Turn::assistant("a")));
        assert_eq!(transcript.response_count(), 2);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }
}
