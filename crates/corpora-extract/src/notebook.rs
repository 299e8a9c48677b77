//! Jupyter notebook extractor.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use serde::Deserialize;
use std::path::Path;

/// Extractor for `.ipynb` files. Keeps markdown and code cells.
pub struct NotebookExtractor;

impl NotebookExtractor {
    /// Create a new notebook extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NotebookExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: NotebookMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows either a single string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            Self::Lines(lines) => lines.concat(),
            Self::Text(text) => text.clone(),
        }
    }
}

#[async_trait]
impl ContentExtractor for NotebookExtractor {
    fn name(&self) -> &str {
        "notebook"
    }

    fn extensions(&self) -> &[&str] {
        &["ipynb"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let raw = tokio::fs::read(path).await?;
        let notebook: Notebook = serde_json::from_slice(&raw)
            .map_err(|e| ExtractError::Parse(format!("Invalid notebook JSON: {e}")))?;

        let text = notebook
            .cells
            .iter()
            .filter(|cell| matches!(cell.cell_type.as_str(), "markdown" | "code"))
            .map(|cell| cell.source.joined())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ExtractedContent {
            text,
            metadata: ContentMetadataInfo {
                language: notebook.metadata.kernelspec.and_then(|k| k.language),
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn extract_json(value: &serde_json::Value) -> Result<ExtractedContent, ExtractError> {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nb.ipynb");
        std::fs::write(&path, value.to_string()).unwrap();
        NotebookExtractor::new().extract(&path).await
    }

    #[tokio::test]
    async fn test_markdown_and_code_cells() {
        let nb = json!({
            "cells": [
                {"cell_type": "markdown", "source": ["# Title\n", "intro"]},
                {"cell_type": "raw", "source": ["skipped"]},
                {"cell_type": "code", "source": ["x = 1\n", "print(x)"], "outputs": []}
            ],
            "metadata": {"kernelspec": {"name": "python3", "language": "python"}},
            "nbformat": 4
        });

        let content = extract_json(&nb).await.unwrap();
        assert_eq!(content.text, "# Title\nintro\nx = 1\nprint(x)");
        assert_eq!(content.metadata.language, Some("python".to_string()));
    }

    #[tokio::test]
    async fn test_source_as_single_string() {
        let nb = json!({
            "cells": [{"cell_type": "code", "source": "a = 2"}]
        });

        let content = extract_json(&nb).await.unwrap();
        assert_eq!(content.text, "a = 2");
        assert_eq!(content.metadata.language, None);
    }

    #[tokio::test]
    async fn test_missing_cells_is_empty() {
        let content = extract_json(&json!({"nbformat": 4})).await.unwrap();
        assert!(content.text.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cells_still_joined() {
        let nb = json!({
            "cells": [
                {"cell_type": "markdown", "source": []},
                {"cell_type": "code", "source": ["y"]}
            ]
        });

        let content = extract_json(&nb).await.unwrap();
        assert_eq!(content.text, "\ny");
    }

    #[tokio::test]
    async fn test_invalid_json_fails() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.ipynb");
        std::fs::write(&path, "{ not json").unwrap();

        let result = NotebookExtractor::new().extract(&path).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[tokio::test]
    async fn test_cell_without_type_fails() {
        let nb = json!({"cells": [{"source": ["orphan"]}]});
        assert!(extract_json(&nb).await.is_err());
    }
}
