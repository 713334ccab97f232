use crate::error::WcrError;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Bitmap to text.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in PNG bytes.
    fn recognize(&self, png: &[u8]) -> Result<String, WcrError>;

    /// Name of this OCR backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Tesseract run as a subprocess from an explicitly configured path.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    executable: PathBuf,
    language: String,
    psm: u8,
}

impl TesseractOcr {
    pub fn new(executable: impl Into<PathBuf>, language: &str, psm: u8) -> Self {
        Self {
            executable: executable.into(),
            language: language.to_string(),
            psm,
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, png: &[u8]) -> Result<String, WcrError> {
        let mut input = tempfile::Builder::new().suffix(".png").tempfile()?;
        input.write_all(png)?;
        input.flush()?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|e| {
                WcrError::service_unavailable(
                    "tesseract",
                    format!("cannot run {}: {e}", self.executable.display()),
                )
            })?;

        if !output.status.success() {
            return Err(WcrError::ToolFailed {
                tool: "tesseract".into(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }

    fn backend_name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_service_unavailable() {
        let ocr = TesseractOcr::new("/nonexistent/tesseract-binary", "eng", 6);
        let err = ocr.recognize(b"not really a png").unwrap_err();
        assert!(matches!(
            err,
            WcrError::ExternalServiceUnavailable { ref service, .. } if service == "tesseract"
        ));
    }
}
