//! Client for the Ollama-compatible chat endpoint. One non-streaming POST
//! per call; the reply text is `message.content` in the response body.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::AppError;
use crate::models::{ChatMessage, MessageRole};

/// One turn of a conversation as sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// Builds wire turns from stored chat messages, preserving insertion order.
pub fn to_chat_turns(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    messages
        .iter()
        .map(|m| match m.role {
            MessageRole::User => ChatTurn::user(&m.content),
            MessageRole::Assistant => ChatTurn::assistant(&m.content),
        })
        .collect()
}

/// Seam between the dialogue logic and the remote text-generation service.
/// Implementations send the full message list in one call and return the
/// reply text; no streaming, no retries.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    model: String,
    messages: Vec<ChatTurn>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    message: ChatTurn,
}

/// Concrete client against a local Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Unexpected(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequestBody {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        debug!(model = %self.model, "Sending completion request to {url}");

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                error!("Completion request timed out");
                AppError::BackendTimeout
            } else if e.is_connect() {
                error!("Could not connect to {}: {e}", self.base_url);
                AppError::BackendUnreachable { host: self.base_url.clone() }
            } else {
                error!("Completion request failed: {e}");
                AppError::BackendUnexpected(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Backend returned {status}: {detail}");
            return Err(AppError::BackendUnexpected(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponseBody = response
            .json()
            .await
            .map_err(|e| AppError::BackendUnexpected(format!("invalid response body: {e}")))?;

        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_the_wire_contract() {
        let body = ChatRequestBody {
            model: "llama3.2".to_string(),
            messages: vec![ChatTurn::system("be brief"), ChatTurn::user("olá")],
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "olá");
    }

    #[test]
    fn response_body_extracts_message_content() {
        let parsed: ChatResponseBody = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"oi"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(parsed.message.content, "oi");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = OllamaClient::new(
            "http://localhost:11434/",
            "llama3.2",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
