use std::sync::Arc;

use papersift_core::{Config, TextExtractor};

pub mod tesseract;

pub use tesseract::TesseractOcr;

/// A [`TextExtractor`] wired to the production backends: MuPDF for PDFs
/// (with the `pdf` feature) and the Tesseract CLI for images.
pub fn default_extractor(config: &Config) -> TextExtractor {
    let extractor = TextExtractor::new().with_ocr(Arc::new(TesseractOcr::from_config(config)));
    with_pdf_backend(extractor)
}

#[cfg(feature = "pdf")]
fn with_pdf_backend(extractor: TextExtractor) -> TextExtractor {
    extractor.with_pdf(Arc::new(papersift_pdf_mupdf::MupdfBackend::new()))
}

#[cfg(not(feature = "pdf"))]
fn with_pdf_backend(extractor: TextExtractor) -> TextExtractor {
    tracing::warn!("PDF support not compiled in (enable the `pdf` feature of papersift-ingest)");
    extractor
}
