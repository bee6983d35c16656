use crate::extract::TextExtractor;
use crate::{EventSink, IncomingFile, Notice, PipelineEvent, UploadedFile, notify};

/// Outcome of one [`UploadManager::add_files`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Names of files added, in processing order.
    pub added: Vec<String>,
    /// Names skipped because a file with the same name was already present.
    pub skipped_duplicates: Vec<String>,
    /// `(name, message)` for every file whose extraction failed.
    pub failed: Vec<(String, String)>,
}

/// Ordered set of uploaded files, unique by name.
#[derive(Debug, Clone, Default)]
pub struct UploadManager {
    files: Vec<UploadedFile>,
}

impl UploadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    /// Extract and add each file, one at a time.
    ///
    /// Files are processed sequentially: the OCR engine is initialized lazily
    /// by the first image and must be ready before the next one is read.
    /// Duplicates are skipped without extraction; a failing file is reported
    /// and the batch moves on.
    pub async fn add_files(
        &mut self,
        incoming: Vec<IncomingFile>,
        extractor: &TextExtractor,
        events: &EventSink,
    ) -> AddReport {
        let mut report = AddReport::default();
        if incoming.is_empty() {
            return report;
        }

        events(PipelineEvent::Busy("Processing files...".to_string()));
        tracing::info!(count = incoming.len(), "processing upload batch");

        for file in incoming {
            if self.contains(&file.name) {
                notify(
                    events,
                    Notice::info(format!("File {} already uploaded.", file.name)),
                );
                report.skipped_duplicates.push(file.name);
                continue;
            }

            match extractor.extract(&file, events).await {
                Ok(text) => {
                    tracing::info!(file = %file.name, chars = text.len(), "file processed");
                    self.files.push(UploadedFile {
                        name: file.name.clone(),
                        text,
                    });
                    notify(events, Notice::success(format!("Processed: {}", file.name)));
                    report.added.push(file.name);
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "file skipped");
                    let message = e.to_string();
                    notify(events, Notice::error(message.clone()));
                    report.failed.push((file.name, message));
                }
            }
        }

        events(PipelineEvent::Idle);
        report
    }

    /// Remove the file at `index`; later files shift down by one.
    ///
    /// Out-of-range indices are ignored.
    pub fn remove_file(&mut self, index: usize) -> Option<UploadedFile> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    /// All extracted text, file by file, separated by blank lines.
    pub fn combined_text(&self) -> String {
        self.files
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
