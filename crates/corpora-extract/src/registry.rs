//! Extractor registry for dispatching files to content extractors.

use corpora_core::{extension_of, ContentExtractor, ExtractError, ExtractedContent};
use std::path::Path;
use std::sync::Arc;

use crate::ocr::OcrEngine;
use crate::raster::PageRasterizer;
use crate::{
    CodeExtractor, CsvExtractor, DocxExtractor, ImageExtractor, NotebookExtractor, OdtExtractor,
    ParquetExtractor, PdfExtractor, PptxExtractor, VideoExtractor,
};

/// Ordered registry of content extractors.
///
/// Lookup walks the extractors in registration order and picks the first
/// one that accepts the file's extension.
pub struct ExtractorRegistry {
    extractors: Vec<(String, Arc<dyn ContentExtractor>)>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// The default dispatch table.
    #[must_use]
    pub fn standard(ocr: Arc<dyn OcrEngine>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        let mut registry = Self::new();
        registry.register("pdf", PdfExtractor::new(ocr.clone(), rasterizer));
        registry.register("csv", CsvExtractor::new());
        registry.register("parquet", ParquetExtractor::new());
        registry.register("docx", DocxExtractor::new());
        registry.register("odt", OdtExtractor::new());
        registry.register("pptx", PptxExtractor::new());
        registry.register("image", ImageExtractor::new(ocr));
        registry.register("code", CodeExtractor::new());
        registry.register("notebook", NotebookExtractor::new());
        registry.register("video", VideoExtractor::new());
        registry
    }

    /// Register an extractor after the existing ones.
    ///
    /// Registering under a name already present replaces that extractor in
    /// place, keeping its position in the dispatch order.
    pub fn register<E: ContentExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor: Arc<dyn ContentExtractor> = Arc::new(extractor);
        match self.extractors.iter_mut().find(|(registered, _)| registered == name) {
            Some(slot) => slot.1 = extractor,
            None => self.extractors.push((name.to_string(), extractor)),
        }
    }

    /// Get the first extractor that handles a file.
    #[must_use]
    pub fn get_for_path(&self, path: &Path) -> Option<Arc<dyn ContentExtractor>> {
        self.extractors
            .iter()
            .find(|(_, extractor)| extractor.can_extract(path))
            .map(|(_, extractor)| extractor.clone())
    }

    /// Extract content from a file.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let extractor = self.get_for_path(path).ok_or_else(|| {
            ExtractError::UnsupportedType(
                extension_of(path).unwrap_or_else(|| path.display().to_string()),
            )
        })?;

        extractor.extract(path).await
    }

    /// Registered names and extensions, in dispatch order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[&str])> {
        self.extractors
            .iter()
            .map(|(name, extractor)| (name.as_str(), extractor.extensions()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
