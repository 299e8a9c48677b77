//! OCR engines for image files and text-less PDF pages.
//!
//! [`TesseractOcr`] drives the `tesseract` executable; [`DisabledOcr`] stands
//! in when OCR is switched off or the engine cannot be found, so handlers
//! that need it fail per file instead of aborting the run.

use async_trait::async_trait;
use corpora_core::ExtractError;
use image::DynamicImage;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Languages passed to tesseract unless configured otherwise.
pub const DEFAULT_LANGUAGES: &str = "eng+heb";

/// Error type for OCR operations.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary could not be located.
    #[error("ocr engine unavailable: {0}")]
    EngineUnavailable(String),

    /// OCR was turned off.
    #[error("ocr is disabled")]
    Disabled,

    /// The engine ran but did not produce text.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The image could not be handed to the engine.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for ExtractError {
    fn from(err: OcrError) -> Self {
        ExtractError::Ocr(err.to_string())
    }
}

/// Trait for optical character recognition backends.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name.
    fn name(&self) -> &str;

    /// Language spec, e.g. `eng+heb`.
    fn languages(&self) -> &str;

    /// Whether recognition can succeed at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Recognize the text in an image.
    async fn recognize(&self, image: DynamicImage) -> Result<String, OcrError>;
}

/// OCR through the `tesseract` command-line program.
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
}

impl TesseractOcr {
    /// Find `program` on `PATH` (or use it as a path) and build an engine.
    pub fn locate(program: impl AsRef<OsStr>, languages: impl Into<String>) -> Result<Self, OcrError> {
        let program = program.as_ref();
        let binary = which::which(program).map_err(|e| {
            OcrError::EngineUnavailable(format!("{}: {e}", program.to_string_lossy()))
        })?;
        Ok(Self::with_binary(binary, languages))
    }

    /// Use a known tesseract binary without a lookup.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
        }
    }

    /// Resolved path of the tesseract executable.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn languages(&self) -> &str {
        &self.languages
    }

    async fn recognize(&self, image: DynamicImage) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("corpora-ocr-")
            .suffix(".png")
            .tempfile()?;
        let input_path = input.path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            image.save_with_format(&input_path, image::ImageFormat::Png)
        })
        .await
        .map_err(|e| OcrError::Recognition(format!("Task join error: {e}")))??;

        debug!(
            "Running {:?} on {:?} (languages: {})",
            self.binary,
            input.path(),
            self.languages
        );

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .output()
            .await?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Engine used when OCR is not available. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOcr;

impl DisabledOcr {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OcrEngine for DisabledOcr {
    fn name(&self) -> &str {
        "disabled"
    }

    fn languages(&self) -> &str {
        ""
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn recognize(&self, _image: DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_image() -> DynamicImage {
        DynamicImage::new_luma8(4, 4)
    }

    #[test]
    fn test_error_display() {
        assert_eq!(OcrError::Disabled.to_string(), "ocr is disabled");
        assert_eq!(
            OcrError::EngineUnavailable("tesseract".to_string()).to_string(),
            "ocr engine unavailable: tesseract"
        );
    }

    #[test]
    fn test_error_into_extract_error() {
        let err: ExtractError = OcrError::Recognition("exit 1".to_string()).into();
        match err {
            ExtractError::Ocr(msg) => assert_eq!(msg, "recognition failed: exit 1"),
            other => panic!("Expected Ocr error, got {other:?}"),
        }
    }

    #[test]
    fn test_locate_missing_binary() {
        let result = TesseractOcr::locate("/nonexistent/bin/tesseract-corpora", DEFAULT_LANGUAGES);
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }

    #[test]
    fn test_with_binary_keeps_languages() {
        let engine = TesseractOcr::with_binary("/usr/bin/tesseract", "eng+heb");
        assert_eq!(engine.languages(), "eng+heb");
        assert_eq!(engine.binary(), Path::new("/usr/bin/tesseract"));
        assert!(engine.is_available());
    }

    #[tokio::test]
    async fn test_disabled_ocr_always_fails() {
        let engine = DisabledOcr::new();
        assert!(!engine.is_available());
        let result = engine.recognize(tiny_image()).await;
        assert!(matches!(result, Err(OcrError::Disabled)));
    }

    #[cfg(unix)]
    fn fake_engine(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-tesseract");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tesseract_invocation_and_stdout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let script = "#!/bin/sh\n[ -s \"$1\" ] || exit 9\necho \"$2 $3 $4\"\n";
        let binary = fake_engine(temp_dir.path(), script);

        let engine = TesseractOcr::with_binary(binary, "eng+heb");
        let text = engine.recognize(tiny_image()).await.unwrap();

        assert_eq!(text.trim(), "stdout -l eng+heb");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tesseract_failure_is_recognition_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let binary = fake_engine(temp_dir.path(), "#!/bin/sh\necho 'bad traineddata' >&2\nexit 1\n");

        let engine = TesseractOcr::with_binary(binary, "xxx");
        let err = engine.recognize(tiny_image()).await.unwrap_err();

        match err {
            OcrError::Recognition(msg) => assert!(msg.contains("bad traineddata")),
            other => panic!("Expected Recognition error, got {other:?}"),
        }
    }
}
