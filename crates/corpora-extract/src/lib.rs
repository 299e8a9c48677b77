//! # corpora-extract
//!
//! Format handlers that turn files into plain text for the corpus builder.
//!
//! Every handler implements [`ContentExtractor`](corpora_core::ContentExtractor)
//! and is looked up by file extension through the ordered
//! [`ExtractorRegistry`].
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`PdfExtractor`] | `.pdf` | Per-page text, OCR fallback for pages without a text layer |
//! | [`CsvExtractor`] | `.csv` | Rendered as an aligned text table |
//! | [`ParquetExtractor`] | `.parquet` | Rendered as an aligned text table |
//! | [`DocxExtractor`] | `.docx` | Paragraph text |
//! | [`OdtExtractor`] | `.odt` | Paragraph and heading text |
//! | [`PptxExtractor`] | `.pptx` | Shape text, slide by slide |
//! | [`ImageExtractor`] | `.png`, `.jpg`, `.jpeg` | OCR |
//! | [`CodeExtractor`] | `.py`, `.js`, `.html`, `.css` | Raw source |
//! | [`NotebookExtractor`] | `.ipynb` | Markdown and code cells |
//! | [`VideoExtractor`] | `.mp4`, `.avi`, `.mkv` | Placeholder line only |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use corpora_extract::{locate_rasterizer, ExtractorRegistry, TesseractOcr};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let ocr = Arc::new(TesseractOcr::locate("tesseract", "eng+heb")?);
//! let registry = ExtractorRegistry::standard(ocr, locate_rasterizer("pdftoppm", 200));
//!
//! let content = registry.extract(Path::new("scan.pdf")).await?;
//! println!("Extracted {} chars", content.text.len());
//! ```
//!
//! ## OCR
//!
//! OCR goes through the [`OcrEngine`] trait. [`TesseractOcr`] runs the
//! `tesseract` binary; [`DisabledOcr`] is the no-op stand-in. PDF pages are
//! turned into images by a [`PageRasterizer`].

use corpora_core::ExtractError;

pub mod code;
pub mod image;
pub mod notebook;
pub mod ocr;
pub mod office;
pub mod pdf;
pub mod raster;
pub mod registry;
pub mod table;
pub mod video;

pub use code::CodeExtractor;
pub use self::image::ImageExtractor;
pub use notebook::NotebookExtractor;
pub use ocr::{DisabledOcr, OcrEngine, OcrError, TesseractOcr, DEFAULT_LANGUAGES};
pub use office::{DocxExtractor, OdtExtractor, PptxExtractor};
pub use pdf::PdfExtractor;
pub use raster::{
    locate_rasterizer, EmbeddedImageRasterizer, PageRasterizer, PdftoppmRasterizer, DEFAULT_DPI,
};
pub use registry::ExtractorRegistry;
pub use table::{CsvExtractor, ParquetExtractor, Table};
pub use video::VideoExtractor;

/// Run a blocking parser on tokio's blocking pool.
///
/// A panic inside `f` surfaces as [`ExtractError::Failed`] for the file.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ExtractError>
where
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
}
