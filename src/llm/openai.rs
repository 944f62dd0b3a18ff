use anyhow::Result;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::{ChatBackend, ChatRequest, ChatResponse};
use crate::error::ChatError;

/// Blocking client for `POST <base_url>/chat/completions`.
///
/// No timeout or retry is configured beyond the transport defaults.
pub struct OpenAiBackend {
    client: Client,
    log_requests: bool,
}

impl OpenAiBackend {
    pub fn new(log_requests: bool) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            log_requests,
        })
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

impl ChatBackend for OpenAiBackend {
    fn complete(
        &self,
        base_url: &str,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, ChatError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| ChatError::request_build("failed to encode chat request", e))?;
        if self.log_requests {
            info!(body = %String::from_utf8_lossy(&body), "chat request");
        }

        let endpoint = endpoint(base_url);
        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| ChatError::transport(format!("POST {endpoint}"), e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().unwrap_or_default();
            debug!(status = status.as_u16(), %endpoint, "chat API returned an error");
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp
            .text()
            .map_err(|e| ChatError::transport("failed to read response body", e))?;
        serde_json::from_str(&text)
            .map_err(|e| ChatError::response_decode("invalid chat completion JSON", e))
    }
}
