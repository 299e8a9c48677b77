//! PDF content extractor.
//!
//! Text is pulled page by page with pdf-extract. A page whose text layer is
//! blank is rasterized and sent through OCR, so scanned documents still
//! contribute text.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::ocr::OcrEngine;
use crate::raster::PageRasterizer;
use crate::run_blocking;

/// Extractor for PDF files.
pub struct PdfExtractor {
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl PdfExtractor {
    /// Create a PDF extractor with an OCR fallback.
    #[must_use]
    pub fn new(ocr: Arc<dyn OcrEngine>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self { ocr, rasterizer }
    }

    /// OCR every rendered image of a text-less page.
    async fn ocr_page(
        &self,
        path: &Path,
        bytes: &[u8],
        page: u32,
        chunks: &mut Vec<String>,
    ) -> Result<(), ExtractError> {
        let images = self.rasterizer.rasterize(path, bytes, page).await?;

        for image in images {
            match self.ocr.recognize(image).await {
                Ok(text) if !text.trim().is_empty() => chunks.push(text),
                Ok(_) => debug!("OCR found no text on page {} of {:?}", page, path),
                Err(e) => debug!("OCR failed on page {} of {:?}: {}", page, path, e),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting PDF: {:?}", path);

        let bytes = tokio::fs::read(path).await?;

        let pages = run_blocking({
            let bytes = bytes.clone();
            move || extract_page_texts(&bytes)
        })
        .await?;

        let mut chunks = Vec::new();
        let mut ocr_pages = 0;

        for (page, text) in (1u32..).zip(&pages) {
            if !text.trim().is_empty() {
                chunks.push(text.clone());
                continue;
            }

            if !self.ocr.is_available() {
                debug!("Page {} of {:?} has no text and OCR is off", page, path);
                continue;
            }

            debug!("Page {} of {:?} has no text layer, running OCR", page, path);
            ocr_pages += 1;
            self.ocr_page(path, &bytes, page, &mut chunks).await?;
        }

        Ok(ExtractedContent {
            text: chunks.join("\n"),
            metadata: ContentMetadataInfo {
                page_count: Some(u32::try_from(pages.len()).unwrap_or(u32::MAX)),
                ocr_pages,
                ..Default::default()
            },
        })
    }
}

/// Extract the text of each page from PDF bytes using pdf-extract.
fn extract_page_texts(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Parse(format!("PDF extraction failed: {e}")))
}
