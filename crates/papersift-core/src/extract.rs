//! MIME-type dispatch from uploaded files to PDF or OCR text extraction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::backend::{OcrEngine, PdfBackend};
use crate::{EventSink, IncomingFile, Notice, PipelineError, PipelineEvent, notify};

/// MIME type of PDF documents.
pub const PDF_MIME: &str = "application/pdf";

/// Produces plain text from uploaded files.
///
/// PDFs go to the configured [`PdfBackend`]; `image/*` files go to the
/// [`OcrEngine`]. The OCR engine is initialized lazily on first use and the
/// outcome is remembered only when it succeeds, so a failed initialization
/// is attempted again on the next image.
pub struct TextExtractor {
    pdf: Option<Arc<dyn PdfBackend>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    ocr_ready: Mutex<bool>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    /// An extractor with no backends; every file fails until backends are attached.
    pub fn new() -> Self {
        Self {
            pdf: None,
            ocr: None,
            ocr_ready: Mutex::new(false),
        }
    }

    pub fn with_pdf(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = Some(backend);
        self
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Whether the OCR engine has been initialized successfully.
    pub async fn ocr_ready(&self) -> bool {
        *self.ocr_ready.lock().await
    }

    /// Initialize the OCR engine if it is not ready yet. Returns readiness.
    pub async fn ensure_ocr(&self, events: &EventSink) -> bool {
        let Some(engine) = &self.ocr else {
            notify(events, Notice::error("OCR engine is not configured."));
            return false;
        };

        // Held across initialization so concurrent callers wait for one attempt.
        let mut ready = self.ocr_ready.lock().await;
        if *ready {
            return true;
        }

        events(PipelineEvent::Busy("Initializing OCR Engine...".to_string()));
        match engine.initialize().await {
            Ok(()) => {
                *ready = true;
                tracing::info!("OCR engine initialized");
                notify(
                    events,
                    Notice::info("OCR engine initialized.").with_duration(Duration::from_secs(2)),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "OCR engine initialization failed");
                notify(events, Notice::error("Failed to initialize OCR engine."));
            }
        }
        events(PipelineEvent::Idle);
        *ready
    }

    /// Extract the text of a single file.
    pub async fn extract(
        &self,
        file: &IncomingFile,
        events: &EventSink,
    ) -> Result<String, PipelineError> {
        if file.mime == PDF_MIME {
            self.extract_pdf(file).await
        } else if file.mime.starts_with("image/") {
            if !self.ensure_ocr(events).await {
                return Err(PipelineError::OcrNotReady);
            }
            self.extract_image(file).await
        } else {
            Err(PipelineError::UnsupportedFileType {
                name: file.name.clone(),
                mime: file.mime.clone(),
            })
        }
    }

    async fn extract_pdf(&self, file: &IncomingFile) -> Result<String, PipelineError> {
        let backend = self.pdf.clone().ok_or_else(|| PipelineError::ExtractionFailed {
            name: file.name.clone(),
            message: "PDF support is not available".to_string(),
        })?;

        // MuPDF and friends are blocking; keep them off the async workers.
        let data = file.data.clone();
        let pages = tokio::task::spawn_blocking(move || backend.extract_pages(&data))
            .await
            .map_err(|e| PipelineError::ExtractionFailed {
                name: file.name.clone(),
                message: format!("task join error: {}", e),
            })?
            .map_err(|e| PipelineError::ExtractionFailed {
                name: file.name.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(file = %file.name, pages = pages.len(), "extracted PDF text");
        Ok(join_pages(&pages))
    }

    async fn extract_image(&self, file: &IncomingFile) -> Result<String, PipelineError> {
        let engine = self.ocr.as_ref().ok_or(PipelineError::OcrNotReady)?;
        engine
            .recognize(&file.data)
            .await
            .map_err(|e| PipelineError::ExtractionFailed {
                name: file.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Concatenate page texts, each followed by a newline, in page order.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(page);
        out.push('\n');
    }
    out
}

/// Pick a MIME type for an incoming file: the declared type unless it is
/// missing or generic, then magic bytes, then the file extension.
pub fn detect_mime(filename: &str, declared: Option<&str>, data: &[u8]) -> String {
    if let Some(mime) = declared.filter(|m| !m.is_empty() && *m != "application/octet-stream") {
        return mime.to_string();
    }

    if data.starts_with(b"%PDF-") {
        return PDF_MIME.to_string();
    }
    if data.starts_with(b"\x89PNG") {
        return "image/png".to_string();
    }
    if data.starts_with(&[0xff, 0xd8, 0xff]) {
        return "image/jpeg".to_string();
    }

    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}
