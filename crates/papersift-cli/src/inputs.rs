use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use papersift_core::extract::detect_mime;
use papersift_core::{IncomingFile, PaperResult, PipelineError};

/// Documents read from disk, plus `(name, message)` for every path that
/// could not be read.
#[derive(Debug, Default)]
pub struct ReadDocuments {
    pub files: Vec<IncomingFile>,
    pub failed: Vec<(String, String)>,
}

/// Read documents from disk, sniffing each one's MIME type. An unreadable
/// path is recorded as failed and the rest are still read.
pub fn read_documents(paths: &[PathBuf]) -> ReadDocuments {
    let mut out = ReadDocuments::default();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(data) => {
                let mime = detect_mime(&name, None, &data);
                out.files.push(IncomingFile::new(name, mime, data));
            }
            Err(e) => {
                let err = PipelineError::ExtractionFailed {
                    name: name.clone(),
                    message: format!("{}: {}", path.display(), e),
                };
                tracing::warn!(error = %err, "skipping unreadable file");
                out.failed.push((name, err.to_string()));
            }
        }
    }
    out
}

/// A results file: a bare array, or an object wrapping it as `results`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsFile {
    Bare(Vec<PaperResult>),
    Wrapped { results: Vec<PaperResult> },
}

pub fn load_results(path: &Path) -> anyhow::Result<Vec<PaperResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_results(&content).with_context(|| format!("Invalid results file {}", path.display()))
}

fn parse_results(content: &str) -> anyhow::Result<Vec<PaperResult>> {
    let parsed: ResultsFile = serde_json::from_str(content)?;
    Ok(match parsed {
        ResultsFile::Bare(results) => results,
        ResultsFile::Wrapped { results } => results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_bare_and_wrapped_results() {
        let bare = r#"[{"title": "A", "source": "arXiv", "citations": 3}]"#;
        let wrapped = r#"{"results": [{"title": "A"}, {"title": "B", "publishedDate": "2020-01-01"}]}"#;

        let a = parse_results(bare).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].citations, Some(3));

        let b = parse_results(wrapped).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b[1].published_date.as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_results(r#"{"papers": []}"#).is_err());
        assert!(parse_results("not json").is_err());
    }

    #[test]
    fn documents_are_named_by_file_and_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("lecture.bin");
        std::fs::File::create(&pdf)
            .unwrap()
            .write_all(b"%PDF-1.7 body")
            .unwrap();
        let png = dir.path().join("board.png");
        std::fs::write(&png, b"????").unwrap();

        let read = read_documents(&[pdf, png]);
        assert!(read.failed.is_empty());
        assert_eq!(read.files[0].name, "lecture.bin");
        assert_eq!(read.files[0].mime, "application/pdf");
        assert_eq!(read.files[1].mime, "image/png");
    }

    #[test]
    fn unreadable_path_is_skipped_and_the_rest_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("notes.pdf");
        std::fs::write(&good, b"%PDF-1.7").unwrap();
        let missing = PathBuf::from("/definitely/not/here.pdf");

        let read = read_documents(&[missing, good]);
        assert_eq!(read.files.len(), 1);
        assert_eq!(read.files[0].name, "notes.pdf");
        assert_eq!(read.failed.len(), 1);
        assert_eq!(read.failed[0].0, "here.pdf");
        assert!(read.failed[0].1.starts_with("Error processing here.pdf: /definitely/not/here.pdf"));
    }
}
