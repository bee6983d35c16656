use std::time::Duration;

use serde::Serialize;

use super::{
    ErrorResponse, ModelBackend, ModelError, ModelFuture, RefineResponse, SummarizeResponse,
};

const REFINE_PATH: &str = "/api/ollama-refine-query";
const SUMMARIZE_PATH: &str = "/api/ollama-summarize-abstract";

/// Client for a server exposing the `/api/ollama-*` endpoints.
///
/// One request per call, no streaming, no retries.
pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

#[derive(Serialize)]
struct RefineBody<'a> {
    query: &'a str,
    model: &'a str,
}

#[derive(Serialize)]
struct SummarizeBody<'a> {
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
    model: &'a str,
}

impl HttpModelClient {
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

    async fn post<B: Serialize>(
        &self,
        path: &str,
        endpoint: &'static str,
        body: &B,
    ) -> Result<reqwest::Response, ModelError> {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(t) = self.timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
            let message = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => fallback,
            };
            return Err(ModelError::Status {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

impl ModelBackend for HttpModelClient {
    fn name(&self) -> &str {
        "http"
    }

    fn refine<'a>(&'a self, prompt: &'a str, model: &'a str) -> ModelFuture<'a, String> {
        Box::pin(async move {
            let resp = self
                .post(
                    REFINE_PATH,
                    "Ollama Query Refinement",
                    &RefineBody {
                        query: prompt,
                        model,
                    },
                )
                .await?;
            let body: RefineResponse = resp.json().await?;
            body.refined_query
                .ok_or(ModelError::MissingField("refined_query"))
        })
    }

    fn summarize<'a>(&'a self, abstract_text: &'a str, model: &'a str) -> ModelFuture<'a, String> {
        Box::pin(async move {
            let resp = self
                .post(
                    SUMMARIZE_PATH,
                    "Ollama Abstract Summarization",
                    &SummarizeBody {
                        abstract_text,
                        model,
                    },
                )
                .await?;
            let body: SummarizeResponse = resp.json().await?;
            body.summary.ok_or(ModelError::MissingField("summary"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = HttpModelClient::new(reqwest::Client::new(), "http://localhost:5001/");
        assert_eq!(c.base_url, "http://localhost:5001");
    }

    #[test]
    fn summarize_body_uses_abstract_key() {
        let v = serde_json::to_value(SummarizeBody {
            abstract_text: "text",
            model: "gemma:3b",
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"abstract": "text", "model": "gemma:3b"}));
    }

    #[test]
    fn status_error_message_carries_endpoint_and_code() {
        let e = ModelError::Status {
            endpoint: "Ollama Query Refinement",
            status: 500,
            message: "model not found".into(),
        };
        assert_eq!(
            e.to_string(),
            "Ollama Query Refinement API error (500): model not found"
        );
    }
}
