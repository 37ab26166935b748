//! # Design Tool
//!
//! Command-line host for the design document pipeline.
//!
//! ## Usage
//!
//! ```bash
//! design-tool build canvas.json --id flyer-1 --editor-kind flyer --out flyer-1.json
//! design-tool optimize flyer-1.json --max-bytes 500000 --out flyer-1.min.json
//! design-tool --data-dir ./designs save flyer-1.min.json
//! design-tool --data-dir ./designs load flyer-1 --kind text
//! design-tool render flyer-1.json --out flyer-1.png --scale 2
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `AppConfig` - Data directory, compression tunables and font override
//! - `commands` - One async handler per subcommand

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use design_core::compress::{DEFAULT_MAX_OBJECTS, DEFAULT_MAX_TEXT_CHARS};
use design_core::{CompressionOptions, KindFilter};
use design_renderer::{OutputEncoding, OutputFormat, RenderOptions, DEFAULT_JPEG_QUALITY};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directory for stored documents.
pub const DEFAULT_DATA_DIR: &str = "design-data";

/// Command-line arguments for design-tool.
#[derive(Debug, Clone, Parser)]
#[command(name = "design-tool")]
#[command(about = "Build, compress, store and render design documents")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding stored document artifacts
    #[arg(long, global = true, env = "DESIGN_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Object limit applied by ultra-minimal compression
    #[arg(long, global = true, env = "DESIGN_ULTRA_MAX_OBJECTS", default_value_t = DEFAULT_MAX_OBJECTS)]
    pub max_objects: usize,

    /// Text length limit applied by ultra-minimal compression
    #[arg(long, global = true, env = "DESIGN_ULTRA_MAX_TEXT_CHARS", default_value_t = DEFAULT_MAX_TEXT_CHARS)]
    pub max_text_chars: usize,

    /// Font file used for all text instead of system fonts
    #[arg(long, global = true, env = "DESIGN_FONT_PATH")]
    pub font: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build a document from an editor's canvas JSON
    Build(BuildArgs),
    /// Compress a document to fit a byte budget
    Optimize(OptimizeArgs),
    /// Store a document as chunked artifacts
    Save {
        /// Document JSON file
        input: PathBuf,
    },
    /// Load a stored document, or only one family of its records
    Load {
        /// Document id
        id: String,
        /// Only return records of this family
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// Output file (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rasterize a document
    Render(RenderArgs),
}

/// Arguments of `build`.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Canvas JSON file
    pub input: PathBuf,
    /// Document id
    #[arg(long)]
    pub id: String,
    /// Editor that produced the canvas (post, flyer, banner, badge...)
    #[arg(long, default_value = "post")]
    pub editor_kind: String,
    /// Template the design was started from
    #[arg(long)]
    pub template_key: Option<String>,
    /// Earlier build of the same document, to carry `createdAt` forward
    #[arg(long)]
    pub previous: Option<PathBuf>,
    /// Omit the metadata block
    #[arg(long)]
    pub no_metadata: bool,
    /// Output file (stdout if omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments of `optimize`.
#[derive(Debug, Clone, Args)]
pub struct OptimizeArgs {
    /// Document JSON file
    pub input: PathBuf,
    /// Byte budget for the serialized result
    #[arg(long)]
    pub max_bytes: usize,
    /// Drop audit timestamps as well
    #[arg(long)]
    pub storage_only: bool,
    /// Output file (stdout if omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments of `render`.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Document JSON file
    pub input: PathBuf,
    /// Output file
    #[arg(long)]
    pub out: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Png)]
    pub format: FormatArg,
    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub quality: u8,
    /// Output pixels per canvas pixel
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,
    /// Write a base64 data URI instead of raw bytes
    #[arg(long)]
    pub data_uri: bool,
}

/// Output format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// PNG
    Png,
    /// JPEG
    Jpeg,
}

/// Record family argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Text records
    Text,
    /// Image records
    Image,
    /// Shape records
    Shape,
    /// Line records
    Line,
}

impl From<KindArg> for KindFilter {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => Self::Text,
            KindArg::Image => Self::Image,
            KindArg::Shape => Self::Shape,
            KindArg::Line => Self::Line,
        }
    }
}

impl From<&RenderArgs> for RenderOptions {
    fn from(args: &RenderArgs) -> Self {
        Self {
            format: match args.format {
                FormatArg::Png => OutputFormat::Png,
                FormatArg::Jpeg => OutputFormat::Jpeg,
            },
            quality: args.quality,
            scale_multiplier: args.scale,
            encoding: if args.data_uri {
                OutputEncoding::DataUri
            } else {
                OutputEncoding::Bytes
            },
        }
    }
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding stored document artifacts.
    pub data_dir: PathBuf,
    /// Compression tunables.
    pub compression: CompressionOptions,
    /// Font file override.
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            compression: CompressionOptions::default(),
            font_path: None,
        }
    }
}

impl AppConfig {
    /// Compression options for one run.
    #[must_use]
    pub fn compression_options(&self, storage_only: bool) -> CompressionOptions {
        CompressionOptions {
            storage_only,
            ..self.compression.clone()
        }
    }
}

impl From<CliArgs> for AppConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            compression: CompressionOptions {
                max_objects: args.max_objects,
                max_text_chars: args.max_text_chars,
                ..CompressionOptions::default()
            },
            font_path: args.font,
        }
    }
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,design_core=debug,design_renderer=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,design_core=debug,design_renderer=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
