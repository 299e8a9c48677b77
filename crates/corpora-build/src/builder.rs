//! Corpus assembly.

use corpora_core::{BuildStats, Corpus, Error, FileOutcome, FileReport, Result};
use corpora_extract::ExtractorRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::walker::{scan_directory, ExcludeSet, WalkOptions};

/// Default name of the corpus file written under the root.
pub const DEFAULT_OUTPUT_NAME: &str = "corpus.txt";

/// Configuration for a corpus build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// File name of the corpus, relative to the root
    pub output_name: String,
    /// Include dot-files and dot-directories
    pub include_hidden: bool,
    /// Descend into symlinked directories
    pub follow_links: bool,
    /// Exclude patterns (glob)
    pub exclude_patterns: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            include_hidden: false,
            follow_links: false,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Where the corpus was written
    pub output_path: PathBuf,
    /// Per-run counters
    pub stats: BuildStats,
    /// Every visited file, in walk order
    pub files: Vec<FileReport>,
}

/// Walks a directory tree and concatenates every extractable file.
pub struct CorpusBuilder {
    /// Root directory being consolidated
    root: PathBuf,
    /// Extractor registry
    extractors: Arc<ExtractorRegistry>,
    /// Configuration
    config: BuilderConfig,
}

impl CorpusBuilder {
    /// Create a new corpus builder.
    pub fn new(
        root: impl Into<PathBuf>,
        extractors: Arc<ExtractorRegistry>,
        config: BuilderConfig,
    ) -> Self {
        Self {
            root: root.into(),
            extractors,
            config,
        }
    }

    /// Get the root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the corpus is written to.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.config.output_name)
    }

    /// Files the build would visit, in order.
    pub async fn scan(&self) -> Result<Vec<PathBuf>> {
        let root = self.root.clone();
        let options = WalkOptions {
            include_hidden: self.config.include_hidden,
            follow_links: self.config.follow_links,
            exclude: ExcludeSet::new(&self.config.exclude_patterns),
            skip: vec![self.output_path()],
        };

        tokio::task::spawn_blocking(move || scan_directory(&root, &options))
            .await
            .map_err(|e| Error::Other(format!("Directory walk failed: {e}")))
    }

    /// Run the whole build and write the corpus file.
    pub async fn run(&self) -> Result<BuildReport> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| Error::Config(format!("Cannot read root {}: {e}", self.root.display())))?;
        if !metadata.is_dir() {
            return Err(Error::Config(format!(
                "Root {} is not a directory",
                self.root.display()
            )));
        }

        let files = self.scan().await?;
        debug!("Found {} file(s) under {:?}", files.len(), self.root);

        let mut corpus = Corpus::new();
        let mut stats = BuildStats::default();

        let mut reports = Vec::with_capacity(files.len());
        for path in &files {
            reports.push(self.process_file(path, &mut corpus, &mut stats).await);
        }

        let output_path = self.output_path();
        tokio::fs::write(&output_path, corpus.render()).await?;

        stats.total_chars = corpus.char_count() as u64;

        debug!("Consolidated corpus saved at {}", output_path.display());
        debug!("Total characters: {}", stats.total_chars);

        Ok(BuildReport {
            output_path,
            stats,
            files: reports,
        })
    }

    /// Run one file through its handler and fold the result into the corpus.
    ///
    /// Handler errors are logged and counted, never returned.
    pub async fn process_file(
        &self,
        path: &Path,
        corpus: &mut Corpus,
        stats: &mut BuildStats,
    ) -> FileReport {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        let mut report = FileReport {
            path: relative.to_path_buf(),
            handler: None,
            outcome: FileOutcome::Unsupported,
            metadata: None,
        };

        match self.extractors.get_for_path(path) {
            None => {
                debug!("No handler for {}, skipping", relative.display());
            }
            Some(extractor) => {
                info!("Processing file: {}", relative.display());
                report.handler = Some(extractor.name().to_string());
                report.outcome = match extractor.extract(path).await {
                    Ok(content) => {
                        stats.ocr_pages += u64::from(content.metadata.ocr_pages);
                        let before = corpus.len();
                        let outcome = if corpus.push(relative, &content.text) {
                            let chars = corpus.entries()[before].text.chars().count();
                            FileOutcome::Appended { chars }
                        } else {
                            debug!("Empty content for {}, skipping", relative.display());
                            FileOutcome::Empty
                        };
                        report.metadata = Some(content.metadata);
                        outcome
                    }
                    Err(e) => {
                        warn!("Error processing {}: {}", relative.display(), e);
                        FileOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
            }
        }

        stats.record(&report.outcome);
        report
    }
}
