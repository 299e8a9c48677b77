//! Source code extractor.

use async_trait::async_trait;
use corpora_core::{
    extension_of, ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent,
};
use std::path::Path;
use tokio::fs;

/// Extractor for web and script sources, read as text.
pub struct CodeExtractor;

impl CodeExtractor {
    /// Create a new code extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for CodeExtractor {
    fn name(&self) -> &str {
        "code"
    }

    fn extensions(&self) -> &[&str] {
        &["py", "js", "html", "css"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = fs::read(path).await?;

        Ok(ExtractedContent {
            text: decode_text(&bytes),
            metadata: ContentMetadataInfo {
                language: extension_of(path),
                ..Default::default()
            },
        })
    }
}

/// Decode UTF-8, dropping invalid byte sequences and normalising newlines.
fn decode_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }

    if text.contains('\r') {
        text = text.replace("\r\n", "\n").replace('\r', "\n");
    }
    text
}
