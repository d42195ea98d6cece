//! OCR engines for receipt text extraction
//!
//! The primary receipt path runs local OCR first and only hands the
//! image to a vision model if OCR yields too little text. Tesseract is
//! invoked as a subprocess against a temp file; availability is a PATH
//! lookup done once at startup.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::image::sniff_format;

/// Concrete OCR engine enum (compile-time dispatch, mirrors the
/// provider client shape)
#[derive(Clone)]
pub enum OcrEngine {
    Tesseract(TesseractOcr),
    Mock(MockOcr),
}

impl OcrEngine {
    /// Extract plain text from raw image bytes
    pub async fn extract_text(&self, image: &[u8]) -> Result<String> {
        match self {
            OcrEngine::Tesseract(e) => e.extract_text(image).await,
            OcrEngine::Mock(e) => e.extract_text(image),
        }
    }
}

/// Tesseract subprocess wrapper
#[derive(Clone)]
pub struct TesseractOcr {
    command: PathBuf,
}

impl TesseractOcr {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Locate tesseract via `TESSERACT_CMD` or the PATH
    ///
    /// Returns None when the binary cannot be found; the caller then
    /// builds a chain without an OCR link.
    pub fn from_env() -> Option<Self> {
        if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
            let path = PathBuf::from(cmd);
            if path.is_file() {
                return Some(Self::new(path));
            }
            return None;
        }
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join("tesseract"))
            .find(|candidate| candidate.is_file())
            .map(Self::new)
    }

    /// Run tesseract on the image and return the recognized text
    pub async fn extract_text(&self, image: &[u8]) -> Result<String> {
        let format = sniff_format(image);
        let dir = tempfile::tempdir()?;
        let input = dir.path().join(format!("receipt.{}", format.extension()));
        tokio::fs::write(&input, image).await?;

        let output = Command::new(&self.command)
            .arg(&input)
            .arg("stdout")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(chars = text.len(), "OCR extracted text");
        Ok(text)
    }
}

/// Mock OCR engine for testing
#[derive(Clone, Default)]
pub struct MockOcr {
    text: String,
    fail: bool,
}

impl MockOcr {
    /// OCR that always returns the given text
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
        }
    }

    /// OCR that always fails
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
        }
    }

    pub fn extract_text(&self, _image: &[u8]) -> Result<String> {
        if self.fail {
            return Err(Error::Extraction("mock OCR failure".into()));
        }
        Ok(self.text.clone())
    }
}
