//! Core types for corpora.
//!
//! ## Extraction
//! - [`ExtractedContent`]: Text produced by a handler for one file
//! - [`ContentMetadataInfo`]: File-level metadata a handler may report
//!
//! ## Corpus
//! - [`Corpus`]: Ordered entries and their delimited serialisation
//! - [`CorpusEntry`]: One file's normalised text
//!
//! ## Accounting
//! - [`FileOutcome`]: What happened to a single file
//! - [`FileReport`]: Per-file line of a build report
//! - [`BuildStats`]: Counters for a whole run

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Extraction
// ============================================================================

/// Content extracted from a file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Main text content
    pub text: String,
    /// File-level metadata
    pub metadata: ContentMetadataInfo,
}

impl ExtractedContent {
    /// Content with no metadata.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ContentMetadataInfo::default(),
        }
    }
}

/// Metadata extracted from file content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMetadataInfo {
    /// Document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Language (source code extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Page count (for PDFs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Pages whose text came from OCR fallback
    #[serde(skip_serializing_if = "is_zero")]
    pub ocr_pages: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &u32) -> bool {
    *n == 0
}

// ============================================================================
// Corpus
// ============================================================================

/// One file's contribution to the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    /// Path shown in the delimiter header
    pub source: PathBuf,
    /// Trimmed, non-empty text
    pub text: String,
}

impl CorpusEntry {
    /// Delimiter header written before every entry.
    #[must_use]
    pub fn header(source: &Path) -> String {
        format!("\n\n---\nFILE: {}\n---\n\n", source.display())
    }

    /// Serialise this entry exactly as it appears in the corpus file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = Self::header(&self.source);
        out.push_str(&self.text);
        out.push('\n');
        out
    }
}

/// The accumulated corpus, in walk order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` for `source` after trimming it.
    ///
    /// Returns `false` (and records nothing) when the trimmed text is empty.
    pub fn push(&mut self, source: impl Into<PathBuf>, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.entries.push(CorpusEntry {
            source: source.into(),
            text: trimmed.to_string(),
        });
        true
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenate every entry into the final corpus text.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries.iter().map(CorpusEntry::render).collect()
    }

    /// Number of characters in the rendered corpus.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.render().chars().count())
            .sum()
    }
}

// ============================================================================
// Accounting
// ============================================================================

/// Result of running one file through the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Text was added to the corpus
    Appended {
        /// Characters of trimmed text added
        chars: usize,
    },
    /// The handler succeeded but produced only whitespace
    Empty,
    /// No handler matches the extension
    Unsupported,
    /// The handler failed
    Failed {
        /// The error as logged
        error: String,
    },
}

/// One file as seen by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the root
    pub path: PathBuf,
    /// Name of the handler, if any matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    /// Metadata the handler reported on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ContentMetadataInfo>,
}

/// Counters for one corpus build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Regular files visited by the walk
    pub files_seen: u64,
    /// Files that contributed an entry
    pub appended: u64,
    /// Files whose handler returned only whitespace
    pub empty: u64,
    /// Files with no matching handler
    pub unsupported: u64,
    /// Files whose handler failed
    pub failed: u64,
    /// PDF pages that went through OCR fallback
    pub ocr_pages: u64,
    /// Characters in the written corpus
    pub total_chars: u64,
}

impl BuildStats {
    /// Fold a file outcome into the counters.
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Appended { .. } => self.appended += 1,
            FileOutcome::Empty => self.empty += 1,
            FileOutcome::Unsupported => self.unsupported += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
    }
}
