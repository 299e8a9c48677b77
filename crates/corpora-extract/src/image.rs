//! Image content extractor.
//!
//! Decodes raster images and runs them through OCR.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::ocr::OcrEngine;
use crate::run_blocking;

/// Extractor for image files.
pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    /// Create an image extractor that recognizes text with `ocr`.
    #[must_use]
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl ContentExtractor for ImageExtractor {
    fn name(&self) -> &str {
        "image"
    }

    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting image: {:?}", path);

        let bytes = tokio::fs::read(path).await?;
        let image = run_blocking(move || decode_image(&bytes)).await?;

        let (width, height) = image.dimensions();
        debug!("Decoded {}x{} image, running {}", width, height, self.ocr.name());

        let text = self.ocr.recognize(image).await?;

        Ok(ExtractedContent {
            text,
            metadata: ContentMetadataInfo {
                title: path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(std::string::ToString::to_string),
                ..Default::default()
            },
        })
    }
}

/// Decode image bytes, sniffing the format from the content.
fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    image::load_from_memory(bytes)
        .map_err(|e| ExtractError::Parse(format!("Failed to load image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{DisabledOcr, OcrError};
    use tempfile::tempdir;

    /// Reports the dimensions of whatever it is given.
    struct DimensionOcr;

    #[async_trait]
    impl OcrEngine for DimensionOcr {
        fn name(&self) -> &str {
            "dimensions"
        }

        fn languages(&self) -> &str {
            "eng+heb"
        }

        async fn recognize(&self, image: DynamicImage) -> Result<String, OcrError> {
            let (w, h) = image.dimensions();
            Ok(format!("  {w}x{h} image\n"))
        }
    }

    fn extractor() -> ImageExtractor {
        ImageExtractor::new(Arc::new(DimensionOcr))
    }

    /// Create a simple 2x2 PNG image for testing
    fn create_test_png() -> Vec<u8> {
        use image::{ImageBuffer, Rgba};

        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255]) // Red
            } else {
                Rgba([0, 255, 0, 255]) // Green
            }
        });

        let mut bytes: Vec<u8> = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        bytes
    }

    /// Create a 3x1 JPEG image for testing
    fn create_test_jpeg() -> Vec<u8> {
        use image::{ImageBuffer, Rgb};

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(3, 1, |_, _| Rgb([0, 0, 255]));

        let mut bytes: Vec<u8> = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg).unwrap();
        bytes
    }

    #[test]
    fn test_can_extract_by_extension() {
        let extractor = extractor();
        assert!(extractor.can_extract(Path::new("photo.png")));
        assert!(extractor.can_extract(Path::new("photo.JPG")));
        assert!(extractor.can_extract(Path::new("photo.jpeg")));
        assert!(!extractor.can_extract(Path::new("photo.gif")));
        assert!(!extractor.can_extract(Path::new("photo.tiff")));
        assert!(!extractor.can_extract(Path::new("document.pdf")));
    }

    #[tokio::test]
    async fn test_extract_png_image() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.png");
        std::fs::write(&file_path, create_test_png()).unwrap();

        let content = extractor().extract(&file_path).await.unwrap();

        // Text is returned untrimmed; the corpus trims it
        assert_eq!(content.text, "  2x2 image\n");
        assert_eq!(content.metadata.title, Some("test.png".to_string()));
    }

    #[tokio::test]
    async fn test_extract_jpeg_image() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.jpg");
        std::fs::write(&file_path, create_test_jpeg()).unwrap();

        let content = extractor().extract(&file_path).await.unwrap();
        assert_eq!(content.text.trim(), "3x1 image");
    }

    #[tokio::test]
    async fn test_format_sniffed_from_content() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("actually_png.jpg");
        std::fs::write(&file_path, create_test_png()).unwrap();

        let content = extractor().extract(&file_path).await.unwrap();
        assert_eq!(content.text.trim(), "2x2 image");
    }

    #[tokio::test]
    async fn test_extract_invalid_image_fails() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("invalid.png");
        std::fs::write(&file_path, b"not an image").unwrap();

        let result = extractor().extract(&file_path).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[tokio::test]
    async fn test_extract_nonexistent_file_fails() {
        let result = extractor().extract(Path::new("/nonexistent/image.png")).await;
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }

    #[tokio::test]
    async fn test_disabled_ocr_fails_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.png");
        std::fs::write(&file_path, create_test_png()).unwrap();

        let result = ImageExtractor::new(Arc::new(DisabledOcr::new()))
            .extract(&file_path)
            .await;
        assert!(matches!(result, Err(ExtractError::Ocr(_))));
    }
}
