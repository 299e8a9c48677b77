//! Video placeholder.
//!
//! Video files are not decoded; each one contributes a single line naming it.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ExtractError, ExtractedContent};
use std::path::{Path, PathBuf};

/// Extractor that records video files without parsing them.
pub struct VideoExtractor {
    /// Prefix stripped from the named path
    root: Option<PathBuf>,
}

impl VideoExtractor {
    /// Create a video extractor that names files as given.
    #[must_use]
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Name files relative to `root`, as the corpus headers do.
    #[must_use]
    pub fn relative_to(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Default for VideoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for VideoExtractor {
    fn name(&self) -> &str {
        "video"
    }

    fn extensions(&self) -> &[&str] {
        &["mp4", "avi", "mkv"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let shown = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        Ok(ExtractedContent::from_text(format!(
            "Video file (not parsed): {}",
            shown.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_names_the_file() {
        let content = VideoExtractor::new()
            .extract(Path::new("media/clip.mkv"))
            .await
            .unwrap();
        assert_eq!(content.text, "Video file (not parsed): media/clip.mkv");
    }

    #[tokio::test]
    async fn test_placeholder_relative_to_root() {
        let extractor = VideoExtractor::relative_to("./library");

        let content = extractor
            .extract(Path::new("./library/films/a.avi"))
            .await
            .unwrap();
        assert_eq!(content.text, "Video file (not parsed): films/a.avi");

        // Paths outside the root are named as given
        let content = extractor.extract(Path::new("other/b.avi")).await.unwrap();
        assert_eq!(content.text, "Video file (not parsed): other/b.avi");
    }

    #[tokio::test]
    async fn test_placeholder_does_not_read_file() {
        let result = VideoExtractor::new()
            .extract(Path::new("/nonexistent/movie.mp4"))
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_extensions() {
        let extractor = VideoExtractor::new();
        assert!(extractor.can_extract(Path::new("a.MP4")));
        assert!(extractor.can_extract(Path::new("a.avi")));
        assert!(!extractor.can_extract(Path::new("a.mov")));
    }
}
