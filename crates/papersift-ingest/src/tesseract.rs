use std::future::Future;
use std::pin::Pin;

use tokio::process::Command;

use papersift_core::{BackendError, Config, OcrEngine};

/// OCR through the `tesseract` command-line tool.
///
/// Initialization checks that the binary runs and that every requested
/// language (`eng`, `eng+deu`, ...) has trained data installed.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    cmd: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(cmd: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tesseract_cmd, &config.ocr_language)
    }

    async fn check(&self) -> Result<(), BackendError> {
        let output = Command::new(&self.cmd)
            .arg("--list-langs")
            .output()
            .await
            .map_err(|e| BackendError::OcrUnavailable(format!("{}: {}", self.cmd, e)))?;
        if !output.status.success() {
            return Err(BackendError::OcrUnavailable(format!(
                "{} exited with {}",
                self.cmd, output.status
            )));
        }

        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        let installed: Vec<&str> = listing.lines().map(str::trim).collect();

        if let Some(missing) = self
            .language
            .split('+')
            .find(|lang| !installed.contains(lang))
        {
            return Err(BackendError::OcrUnavailable(format!(
                "language data '{}' is not installed",
                missing
            )));
        }
        tracing::debug!(cmd = %self.cmd, language = %self.language, "tesseract available");
        Ok(())
    }

    async fn run(&self, image: &[u8]) -> Result<String, BackendError> {
        let file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(file.path(), image).await?;

        let output = Command::new(&self.cmd)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::ExtractionError(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn initialize<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>> {
        Box::pin(self.check())
    }

    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        Box::pin(self.run(image))
    }
}
