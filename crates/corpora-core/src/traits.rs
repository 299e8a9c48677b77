//! Core traits for corpora components.
//!
//! [`ContentExtractor`] is the seam between the build loop and the
//! format-specific handlers in `corpora-extract`. Handlers are looked up by
//! file extension, so adding a format means implementing this trait and
//! registering it.

use async_trait::async_trait;
use std::path::Path;

use crate::error::ExtractError;
use crate::types::ExtractedContent;

/// Lowercased extension of `path`, without the dot.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Trait for extracting text from files.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Short handler name, used in logs and the format listing.
    fn name(&self) -> &str;

    /// Lowercase extensions (without the dot) this extractor handles.
    fn extensions(&self) -> &[&str];

    /// Check if this extractor can handle the given file.
    fn can_extract(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    /// Extract content from a file.
    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError>;
}
