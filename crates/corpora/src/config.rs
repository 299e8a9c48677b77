//! Configuration handling for corpora.
//!
//! The config file is optional and every field has a default, so a missing
//! file behaves like an empty one.

use anyhow::{Context, Result};
use corpora_build::{BuilderConfig, DEFAULT_OUTPUT_NAME};
use corpora_extract::{DEFAULT_DPI, DEFAULT_LANGUAGES};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory walk configuration
    #[serde(default)]
    pub walk: WalkConfig,

    /// OCR configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// PDF rasterizing configuration
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Corpus file name, written under the root
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
        }
    }
}

/// Walk-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WalkConfig {
    /// Include dot-files and dot-directories
    #[serde(default)]
    pub include_hidden: bool,

    /// Descend into symlinked directories
    #[serde(default)]
    pub follow_links: bool,

    /// File patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// OCR-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OcrConfig {
    /// Run OCR on images and text-less PDF pages
    #[serde(default = "default_ocr_enabled")]
    pub enabled: bool,

    /// Tesseract language spec
    #[serde(default = "default_languages")]
    pub languages: String,

    /// Tesseract executable, looked up on `PATH`
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
}

fn default_ocr_enabled() -> bool {
    true
}

fn default_languages() -> String {
    DEFAULT_LANGUAGES.to_string()
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: default_ocr_enabled(),
            languages: default_languages(),
            tesseract: default_tesseract(),
        }
    }
}

/// PDF-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdfConfig {
    /// Poppler renderer, looked up on `PATH`
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,

    /// Render resolution for OCR
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            pdftoppm: default_pdftoppm(),
            dpi: default_dpi(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from the default location, or defaults when there is no file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path`, falling back to the default location.
    ///
    /// An explicit path must exist; the default one may be absent.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::read(&path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.log_level()?;
        Ok(config)
    }

    /// Path of the default config file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Sample config file with every default spelled out.
    #[must_use]
    pub fn sample_toml() -> &'static str {
        r#"# corpora configuration

[output]
# Corpus file written under the root directory
file_name = "corpus.txt"

[walk]
include_hidden = false
follow_links = false
# Glob patterns, e.g. ["**/node_modules/**", "*.tmp"]
exclude = []

[ocr]
enabled = true
languages = "eng+heb"
tesseract = "tesseract"

[pdf]
pdftoppm = "pdftoppm"
dpi = 200

[logging]
# trace, debug, info, warn or error
level = "info"
"#
    }

    /// Configured log level.
    pub fn log_level(&self) -> Result<Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown log level {:?}", self.logging.level))
    }

    /// Builder settings derived from this config.
    #[must_use]
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            output_name: self.output.file_name.clone(),
            include_hidden: self.walk.include_hidden,
            follow_links: self.walk.follow_links,
            exclude_patterns: self.walk.exclude.clone(),
        }
    }
}

/// Get the XDG config directory for corpora.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CORPORA_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "corpora").map(|dirs| dirs.config_dir().to_path_buf())
}
