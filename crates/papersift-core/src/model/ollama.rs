use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ModelBackend, ModelError, ModelFuture};
use crate::prompt::summary_prompt;

/// Direct client for Ollama's `/api/chat` endpoint (non-streaming).
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one user message and return the trimmed reply.
    pub async fn chat(&self, model: &str, content: &str) -> Result<String, ModelError> {
        tracing::debug!(model, chars = content.len(), "ollama chat request");
        let mut req = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest {
                model,
                messages: [ChatMessage {
                    role: "user",
                    content,
                }],
                stream: false,
            });
        if let Some(t) = self.timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<OllamaErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("HTTP {}", status),
            };
            return Err(ModelError::Status {
                endpoint: "Ollama chat",
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = resp.json().await?;
        body.message
            .map(|m| m.content.trim().to_string())
            .ok_or(ModelError::MissingField("message"))
    }
}

impl ModelBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn refine<'a>(&'a self, prompt: &'a str, model: &'a str) -> ModelFuture<'a, String> {
        Box::pin(async move { self.chat(model, prompt).await })
    }

    fn summarize<'a>(&'a self, abstract_text: &'a str, model: &'a str) -> ModelFuture<'a, String> {
        Box::pin(async move {
            let prompt = summary_prompt(abstract_text);
            self.chat(model, &prompt).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_is_single_non_streaming_user_message() {
        let body = ChatRequest {
            model: "gemma:2b",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
            stream: false,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "gemma:2b",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": false
            })
        );
    }

    #[test]
    fn chat_response_without_message_parses_as_none() {
        let body: ChatResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(body.message.is_none());
    }
}
