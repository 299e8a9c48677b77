//! Corpus building engine for corpora.
//!
//! This crate walks a directory tree, runs every file through the matching
//! extractor and writes one delimited text corpus.
//!
//! # Components
//!
//! - [`CorpusBuilder`]: Drives a build from walk to output file
//! - [`BuilderConfig`]: Configuration for the builder
//! - [`BuildReport`]: Output path and counters of a finished build
//! - [`scan_directory`]: The deterministic directory walk
//!
//! # Example
//!
//! ```rust,ignore
//! use corpora_build::{BuilderConfig, CorpusBuilder};
//!
//! let builder = CorpusBuilder::new(".", registry, BuilderConfig::default());
//! let report = builder.run().await?;
//!
//! println!("Consolidated corpus saved at {}", report.output_path.display());
//! println!("Total characters: {}", report.stats.total_chars);
//! ```

pub mod builder;
pub mod walker;

pub use builder::{BuildReport, BuilderConfig, CorpusBuilder, DEFAULT_OUTPUT_NAME};
pub use walker::{scan_directory, ExcludeSet, WalkOptions};
