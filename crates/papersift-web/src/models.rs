use std::sync::{Arc, Mutex};

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use papersift_core::{
    AddReport, EventSink, Notice, PaperResult, PipelineEvent, RenderedResults, ResultStats,
    UploadedFile,
};

use crate::state::SESSION_HEADER;

// ── Notices raised while handling one request ───────────────────────────

/// Collects the notices a pipeline call raises so they can be returned in
/// the response body.
#[derive(Clone, Default)]
pub struct NoticeLog(Arc<Mutex<Vec<Notice>>>);

impl NoticeLog {
    pub fn sink(&self) -> EventSink {
        let log = self.0.clone();
        Arc::new(move |event| match event {
            PipelineEvent::Notice(n) => {
                log.lock().unwrap_or_else(|e| e.into_inner()).push(n);
            }
            PipelineEvent::Busy(text) => tracing::debug!(%text, "busy"),
            PipelineEvent::Idle => {}
        })
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

// ── Request bodies ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub results: Vec<PaperResult>,
}

#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub criteria: String,
}

// ── Response bodies ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FileJson {
    pub name: String,
    /// Length of the extracted text, in characters.
    pub chars: usize,
}

impl From<&UploadedFile> for FileJson {
    fn from(f: &UploadedFile) -> Self {
        Self {
            name: f.name.clone(),
            chars: f.text.chars().count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailedFileJson {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileJson>,
    pub added: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub failed: Vec<FailedFileJson>,
    pub notices: Vec<Notice>,
}

impl FilesResponse {
    pub fn new(files: &[UploadedFile], report: AddReport, notices: Vec<Notice>) -> Self {
        Self {
            files: files.iter().map(FileJson::from).collect(),
            added: report.added,
            skipped_duplicates: report.skipped_duplicates,
            failed: report
                .failed
                .into_iter()
                .map(|(name, message)| FailedFileJson { name, message })
                .collect(),
            notices,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueriesResponse {
    pub queries: Vec<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
pub struct VerboseQueryResponse {
    pub verbose_query: Option<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub html: String,
    pub show_header: bool,
    pub show_export: bool,
    pub stats: ResultStats,
    pub notices: Vec<Notice>,
}

impl RenderResponse {
    pub fn new(rendered: RenderedResults, notices: Vec<Notice>) -> Self {
        Self {
            html: rendered.html,
            show_header: rendered.show_header,
            show_export: rendered.show_export,
            stats: rendered.stats,
            notices,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub index: usize,
    pub expanded: bool,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct SortResponse {
    pub criteria: String,
    pub html: String,
}

// ── Response helpers ────────────────────────────────────────────────────

pub fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// The session id sent by the client, if any.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Attach the session id header to any response.
pub fn with_session(session_id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
