use tracing::debug;

use super::{ChatBackend, ChatRequest, Usage};
use crate::config::{DEFAULT_BASE_URL, ProviderConfig};
use crate::error::ChatError;
use crate::history::{ConversationHistory, Message};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const TEMPERATURE: f64 = 0.7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub usage: Usage,
}

pub struct ChatClient<B> {
    backend: B,
}

impl<B: ChatBackend> ChatClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Asks `question` in the context of `history`.
    ///
    /// The question is recorded before the request goes out and stays there
    /// even if the exchange fails. On success the answer is recorded too. The
    /// full transcript is resent every time, so traffic grows quadratically
    /// over a long session.
    pub fn send(
        &self,
        config: &ProviderConfig,
        history: &mut ConversationHistory,
        question: &str,
    ) -> Result<Answer, ChatError> {
        let model = non_empty(&config.model).unwrap_or(DEFAULT_MODEL);
        let base_url = non_empty(&config.base_url).unwrap_or(DEFAULT_BASE_URL);
        let max_tokens = match config.max_tokens {
            0 => DEFAULT_MAX_TOKENS,
            n => n,
        };

        history.append(Message::user(question));

        let request = ChatRequest {
            model,
            messages: history.messages(),
            max_tokens,
            temperature: TEMPERATURE,
        };
        debug!(model, base_url, messages = history.len(), "sending chat request");
        let response = self.backend.complete(base_url, &config.api_key, &request)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyResponse)?;
        let text = choice.message.content.unwrap_or_default();

        history.append(Message::assistant(text.clone()));
        debug!(
            total_tokens = response.usage.total_tokens,
            turns = history.turn_count(),
            "chat exchange complete"
        );

        Ok(Answer {
            text,
            usage: response.usage,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
