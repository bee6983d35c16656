use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod queries;
pub mod render;
pub mod session;
pub mod sort;
pub mod stats;
pub mod summarize;
pub mod upload;
pub mod verbose;

// Re-export for convenience
pub use backend::{BackendError, OcrEngine, PdfBackend};
pub use extract::TextExtractor;
pub use model::{HttpModelClient, ModelBackend, ModelError, OllamaClient};
pub use pipeline::Pipeline;
pub use queries::{ParsedQueries, QueryGenerator, QueryParseError, QueryRequest, parse_queries};
pub use render::{RenderedResults, ResultsRenderer, ResultsView};
pub use session::Session;
pub use sort::SortCriteria;
pub use stats::ResultStats;
pub use summarize::{AbstractSummarizer, truncate_with_ellipsis};
pub use upload::{AddReport, UploadManager};
pub use verbose::VerboseQueryGenerator;

/// Model identifier sent with every generation request unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gemma:3b";

/// A document whose text has been extracted and added to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub text: String,
}

/// A raw upload, before text extraction.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    /// MIME type as reported by the uploader (e.g. `application/pdf`, `image/png`).
    pub mime: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }
}

/// A paper returned by the (external) search step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperResult {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub citations: Option<u64>,
    /// Downstream BM25 score, when the search side ranked the results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// A [`PaperResult`] enriched with the summary shown on its card.
///
/// `ai_summary` is the model's summary, or the original abstract when the
/// abstract was too short to summarize. It is only `None` when the paper has
/// no abstract at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedPaper {
    #[serde(flatten)]
    pub paper: PaperResult,
    pub ai_summary: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unsupported file type: {name}")]
    UnsupportedFileType { name: String, mime: String },
    #[error("OCR Engine not ready. Cannot process image.")]
    OcrNotReady,
    #[error("Error processing {name}: {message}")]
    ExtractionFailed { name: String, message: String },
    #[error("Failed to generate AI queries: {0}")]
    QueryGenerationFailed(String),
    #[error("Failed to generate AI verbose query for BM25: {0}")]
    VerboseQueryFailed(String),
    #[error("Failed to summarize abstract: {0}")]
    SummarizationFailed(String),
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short, auto-dismissing message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// How long the notice stays visible before it is dismissed.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: DEFAULT_NOTICE_DURATION,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Events emitted while the pipeline works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A long-running step started; `text` describes it.
    Busy(String),
    /// The current long-running step finished.
    Idle,
    Notice(Notice),
}

/// Receiver for [`PipelineEvent`]s.
pub type EventSink = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// An [`EventSink`] that drops everything.
pub fn discard_events() -> EventSink {
    Arc::new(|_| {})
}

pub(crate) fn notify(events: &EventSink, notice: Notice) {
    events(PipelineEvent::Notice(notice));
}

/// Runtime configuration for the pipeline and its transports.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model identifier sent with every generation request.
    pub model: String,
    /// Base URL of the server exposing `/api/ollama-*` endpoints.
    pub backend_url: String,
    /// Base URL of the Ollama server used by the proxy endpoints.
    pub ollama_url: String,
    /// Optional per-request HTTP timeout. `None` leaves it to the transport.
    pub request_timeout_secs: Option<u64>,
    /// Characters of extracted text embedded in the query prompt.
    pub query_context_chars: usize,
    /// Characters of extracted text embedded in the verbose-query prompt.
    pub verbose_context_chars: usize,
    /// Abstracts at or below this length are used as-is instead of summarized.
    pub summary_min_chars: usize,
    /// Characters of a summary shown on a collapsed card.
    pub abstract_display_chars: usize,
    pub tesseract_cmd: String,
    pub ocr_language: String,
    /// Address the web server binds to.
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend_url: "http://127.0.0.1:5001".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            request_timeout_secs: None,
            query_context_chars: 4000,
            verbose_context_chars: 5000,
            summary_min_chars: 50,
            abstract_display_chars: 300,
            tesseract_cmd: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            bind: "0.0.0.0:5001".to_string(),
        }
    }
}

impl Config {
    /// Override fields from `PAPERSIFT_*` / `OLLAMA_HOST` environment variables.
    pub fn apply_env(mut self) -> Self {
        if let Ok(model) = std::env::var("PAPERSIFT_MODEL") {
            self.model = model;
        }
        if let Ok(url) = std::env::var("PAPERSIFT_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.ollama_url = host;
        }
        if let Ok(bind) = std::env::var("PAPERSIFT_BIND") {
            self.bind = bind;
        }
        self
    }
}

/// Take the first `max_chars` characters of `s` (not bytes).
pub fn char_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
