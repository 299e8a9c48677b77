//! # corpora-core
//!
//! Core types and traits for corpora, a tool that flattens a directory of
//! heterogeneous documents into one delimited text corpus.
//!
//! - **Content Extraction**: [`ContentExtractor`] trait implemented by every format handler
//! - **Corpus Assembly**: [`Corpus`] accumulates per-file text with delimiter headers
//! - **Run Accounting**: [`BuildStats`] and [`FileOutcome`] describe what a run did
//!
//! ## Architecture
//!
//! ```text
//! walk(root) → ContentExtractor (by extension) → Corpus::push → corpus.txt
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExtractedContent`] | Text plus metadata returned by a handler |
//! | [`Corpus`] | Ordered `(source, text)` entries and their serialisation |
//! | [`BuildStats`] | Counters for one corpus build |
//!
//! ## Related Crates
//!
//! - `corpora-extract`: handlers for PDF, office, tabular, image, code and notebook files
//! - `corpora-build`: directory walker and the build driver loop

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, ExtractError, Result};
pub use traits::*;
pub use types::*;
