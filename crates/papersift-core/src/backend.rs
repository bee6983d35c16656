use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors operate on in-memory document bytes and return one string
/// per page, in page order. Within a page, positioned text fragments are
/// joined with single spaces.
pub trait PdfBackend: Send + Sync {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError>;
}

/// Trait for OCR engines.
///
/// An engine must be initialized before [`recognize`](OcrEngine::recognize)
/// is called. Initialization may fail (missing binary, missing language
/// data); callers are expected to retry it later rather than give up.
pub trait OcrEngine: Send + Sync {
    fn initialize<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>>;

    /// Recognize the text in an encoded image (PNG, JPEG, ...).
    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;
}
