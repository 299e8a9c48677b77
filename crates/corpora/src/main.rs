//! # corpora CLI
//!
//! Flattens a directory of heterogeneous documents (PDF, office files,
//! spreadsheets, images, notebooks, source code) into one delimited text
//! corpus.
//!
//! ## Commands
//!
//! - `corpora build [ROOT]` - Build `<ROOT>/corpus.txt` (the default command)
//! - `corpora formats` - List handled file extensions
//! - `corpora config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Consolidate the current directory
//! corpora
//!
//! # Consolidate another tree without OCR
//! corpora build ~/Documents --no-ocr -o docs.txt
//!
//! # Get JSON output
//! corpora build ~/Documents --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corpora_build::CorpusBuilder;
use corpora_extract::{
    locate_rasterizer, DisabledOcr, EmbeddedImageRasterizer, ExtractorRegistry, OcrEngine,
    TesseractOcr, VideoExtractor,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::FmtSubscriber;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "corpora")]
#[command(about = "Flatten a directory of documents into a single text corpus")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/corpora/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus for a directory
    Build {
        /// Root directory to consolidate
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Corpus file name, written under the root
        #[arg(short, long)]
        output: Option<String>,

        /// Skip OCR for images and scanned PDF pages
        #[arg(long)]
        no_ocr: bool,

        /// Include dot-files and dot-directories
        #[arg(long)]
        include_hidden: bool,
    },

    /// List the file formats and their handlers
    Formats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for the format table.
#[derive(Serialize)]
struct FormatItem {
    handler: String,
    extensions: Vec<String>,
}

/// Options for one build, after flags are applied.
struct BuildArgs {
    root: PathBuf,
    output: Option<String>,
    no_ocr: bool,
    include_hidden: bool,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output: None,
            no_ocr: false,
            include_hidden: false,
        }
    }
}

/// Pick the OCR engine for this run.
fn ocr_engine(config: &Config, no_ocr: bool) -> Arc<dyn OcrEngine> {
    if no_ocr || !config.ocr.enabled {
        info!("OCR disabled");
        return Arc::new(DisabledOcr::new());
    }

    match TesseractOcr::locate(&config.ocr.tesseract, config.ocr.languages.clone()) {
        Ok(engine) => {
            info!(
                "Using OCR engine {} ({})",
                engine.binary().display(),
                engine.languages()
            );
            Arc::new(engine)
        }
        Err(e) => {
            warn!("{e}; images and scanned PDF pages will yield no text");
            Arc::new(DisabledOcr::new())
        }
    }
}

async fn build(config: &Config, args: BuildArgs, format: OutputFormat) -> Result<()> {
    let mut builder_config = config.builder_config();
    if let Some(output) = args.output {
        builder_config.output_name = output;
    }
    if args.include_hidden {
        builder_config.include_hidden = true;
    }

    let ocr = ocr_engine(config, args.no_ocr);
    let rasterizer = locate_rasterizer(&config.pdf.pdftoppm, config.pdf.dpi);
    let mut registry = ExtractorRegistry::standard(ocr, rasterizer);
    registry.register("video", VideoExtractor::relative_to(&args.root));

    let builder = CorpusBuilder::new(&args.root, Arc::new(registry), builder_config);
    info!("Building corpus for {}", builder.root().display());
    let report = builder
        .run()
        .await
        .with_context(|| format!("Failed to build corpus for {}", args.root.display()))?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
        OutputFormat::Text => {
            println!("Consolidated corpus saved at {}", report.output_path.display());
            println!("Total characters: {}", report.stats.total_chars);
        }
    }

    Ok(())
}

fn formats(format: OutputFormat) -> Result<()> {
    // Lookup only; no engine is needed to list the table
    let registry = ExtractorRegistry::standard(
        Arc::new(DisabledOcr::new()),
        Arc::new(EmbeddedImageRasterizer::new()),
    );

    let items: Vec<FormatItem> = registry
        .entries()
        .map(|(name, extensions)| FormatItem {
            handler: name.to_string(),
            extensions: extensions.iter().map(|ext| format!(".{ext}")).collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&items).context("Failed to serialize formats")?
            );
        }
        OutputFormat::Text => {
            for item in &items {
                println!("{:<10} {}", item.handler, item.extensions.join(", "));
            }
        }
    }

    Ok(())
}

/// Logs share stdout with the summary in text mode and move to stderr
/// when stdout carries JSON.
fn logs_to_stdout(format: OutputFormat) -> bool {
    format == OutputFormat::Text
}

fn log_writer(format: OutputFormat) -> BoxMakeWriter {
    if logs_to_stdout(format) {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from file or CLI-specified path
    let config = if let Some(ref path) = cli.config {
        Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load().context("Failed to load config")?
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(log_writer(cli.format))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        None => build(&config, BuildArgs::default(), cli.format).await?,

        Some(Commands::Build {
            root,
            output,
            no_ocr,
            include_hidden,
        }) => {
            let args = BuildArgs {
                root,
                output,
                no_ocr,
                include_hidden,
            };
            build(&config, args, cli.format).await?;
        }

        Some(Commands::Formats) => formats(cli.format)?,

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
