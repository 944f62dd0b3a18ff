pub mod client;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::history::Message;

/// Body of one chat-completion call. Carries the whole transcript.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One HTTP exchange with an OpenAI-compatible endpoint.
///
/// Implementations encode the request, authenticate with `api_key`, and map
/// a non-200 status to [`ChatError::Api`]. Interpreting the choices is left
/// to [`client::ChatClient`].
pub trait ChatBackend {
    fn complete(
        &self,
        base_url: &str,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, ChatError>;
}
