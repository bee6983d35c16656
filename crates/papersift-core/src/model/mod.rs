//! Transports to the language-model backend.
//!
//! [`HttpModelClient`] talks to a server exposing the `/api/ollama-*`
//! endpoints; [`OllamaClient`] talks to Ollama directly and is what those
//! endpoints are built on.

pub mod http;
pub mod mock;
pub mod ollama;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpModelClient;
pub use ollama::OllamaClient;

pub type ModelFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ModelError>> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} API error ({status}): {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

/// A language-model backend that can refine prompts and summarize abstracts.
pub trait ModelBackend: Send + Sync {
    /// Short name for logs (e.g. "http", "ollama").
    fn name(&self) -> &str;

    /// Send a fully-composed prompt and return the model's raw text.
    fn refine<'a>(&'a self, prompt: &'a str, model: &'a str) -> ModelFuture<'a, String>;

    /// Summarize a paper abstract.
    fn summarize<'a>(&'a self, abstract_text: &'a str, model: &'a str) -> ModelFuture<'a, String>;
}

/// Body of `POST /api/ollama-refine-query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineRequest {
    pub query: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineResponse {
    pub refined_query: Option<String>,
}

/// Body of `POST /api/ollama-summarize-abstract`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: Option<String>,
}

/// Error body returned by the endpoints on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
