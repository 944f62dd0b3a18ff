use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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
}

/// Chronological transcript of one session.
///
/// Only grows at the end until [`reset`](Self::reset); existing messages are
/// never edited. No length cap is applied.
#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Completed turns. A trailing unanswered question does not count.
    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_count_tracks_pairs() {
        let mut history = ConversationHistory::new();
        for n in 1..=3 {
            history.append(Message::user(format!("q{n}")));
            history.append(Message::assistant(format!("a{n}")));
            assert_eq!(history.len(), 2 * n);
            assert_eq!(history.turn_count(), n);
        }
    }

    #[test]
    fn test_dangling_question_undercounts() {
        let mut history = ConversationHistory::new();
        history.append(Message::user("q"));
        assert_eq!(history.turn_count(), 0);
        history.append(Message::assistant("a"));
        history.append(Message::user("q2"));
        assert_eq!(history.turn_count(), 1);
    }

    #[test]
    fn test_reset_empties_history() {
        let mut history = ConversationHistory::new();
        history.append(Message::user("q"));
        history.append(Message::assistant("a"));
        history.append(Message::user("orphan"));
        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.turn_count(), 0);

        history.reset();
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
