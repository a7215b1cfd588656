//! Shared CLI definitions for shoplens.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// File format for order tables (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Pipe-separated values
    Psv,
    /// Parquet columnar format
    Parquet,
}

impl FileFormat {
    /// Detect file format from path, looking through a compression suffix
    /// (`orders.csv.gz` is CSV). Returns None when the extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if CompressionFormat::from_extension(path).is_some() {
            return path
                .file_stem()
                .map(Path::new)
                .and_then(|stem| stem.extension())
                .and_then(|e| e.to_str())
                .and_then(Self::from_extension);
        }
        Self::from_extension(ext)
    }

    /// Parse format from extension string (e.g. "parquet", "csv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "psv" => Some(Self::Psv),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Field separator for delimited formats
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Psv => Some(b'|'),
            Self::Parquet => None,
        }
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            Self::from_name(ext)
        } else {
            None
        }
    }

    /// Parse a compression name or extension ("gzip", "gz", "zstd", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// The display tabs a bundle can be assembled for.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum ViewName {
    /// Purchases over time: per year, month, month-year and weekday
    #[value(name = "early-eda")]
    EarlyEda,
    /// Top-10 product categories and average prices
    #[value(name = "top-products")]
    TopProducts,
    /// Payment-method sample, distribution and per-year breakdown
    #[value(name = "payment-analysis")]
    PaymentAnalysis,
    /// Customers and mean delivery time per state
    #[value(name = "customer-analysis")]
    CustomerAnalysis,
    /// Correlation matrix and price/weight vs freight scatter data
    #[value(name = "correlation")]
    Correlation,
    /// Covariance matrix and price/weight vs freight covariance
    #[value(name = "covariance")]
    Covariance,
    /// Question and answer summaries
    #[value(name = "q-and-a")]
    QAndA,
}

impl ViewName {
    pub const ALL: [Self; 7] = [
        Self::EarlyEda,
        Self::TopProducts,
        Self::PaymentAnalysis,
        Self::CustomerAnalysis,
        Self::Correlation,
        Self::Covariance,
        Self::QAndA,
    ];

    /// Stable identifier, identical to the `--view` value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EarlyEda => "early-eda",
            Self::TopProducts => "top-products",
            Self::PaymentAnalysis => "payment-analysis",
            Self::CustomerAnalysis => "customer-analysis",
            Self::Correlation => "correlation",
            Self::Covariance => "covariance",
            Self::QAndA => "q-and-a",
        }
    }

    /// Human readable tab title
    pub fn title(self) -> &'static str {
        match self {
            Self::EarlyEda => "Early EDA",
            Self::TopProducts => "Top 10 Products",
            Self::PaymentAnalysis => "Payment Analysis",
            Self::CustomerAnalysis => "Customer Analysis",
            Self::Correlation => "Correlation",
            Self::Covariance => "Covariance",
            Self::QAndA => "Q&A",
        }
    }
}

/// How a bundle is written to stdout
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Plain text tables
    Text,
}

/// Command-line arguments for shoplens
#[derive(Clone, Parser, Debug)]
#[command(
    name = "shoplens",
    version,
    about = "Analytical views over e-commerce order tables"
)]
pub struct Args {
    /// Path to the order table (csv, tsv, psv, parquet; csv may be compressed).
    /// Not required with --generate-config
    #[arg(required_unless_present = "generate_config", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Which bundle to assemble. Use it once per bundle; all bundles when omitted
    #[arg(long = "view", short = 'v', value_enum)]
    pub views: Vec<ViewName>,

    /// Output format written to stdout
    #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Specify that the file has no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Force file format (csv, tsv, psv, parquet).
    /// By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Number of categories kept in top-N rankings (default: 10)
    #[arg(long = "top-n", value_name = "N")]
    pub top_n: Option<usize>,

    /// Seed for the deterministic payment-type sample
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Enable debug logging to stderr
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/shoplens/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

fn markdown_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// `<NAME>` placeholders for an argument's values, empty for flags.
fn value_placeholder(arg: &clap::Arg) -> String {
    if !arg.is_positional() && !arg.get_action().takes_values() {
        return String::new();
    }
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n| format!("<{}>", n.as_str()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn option_label(arg: &clap::Arg) -> String {
    let placeholder = value_placeholder(arg);
    if arg.is_positional() {
        return if arg.is_required_set() {
            placeholder
        } else {
            format!("[{placeholder}]")
        };
    }
    let flags: Vec<String> = arg
        .get_short()
        .map(|s| format!("-{s}"))
        .into_iter()
        .chain(arg.get_long().map(|l| format!("--{l}")))
        .collect();
    [flags.join(", "), placeholder]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Markdown reference for the command line: usage, options and the views
/// `--view` accepts. Printed by the gen_docs binary.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = format!(
        "# shoplens command line\n\n## Usage\n\n```\n{}\n```\n\n",
        cmd.render_usage()
    );

    out.push_str("## Options\n\n| Option | Description |\n|--------|-------------|\n");
    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_str();
        if id == "help" || id == "version" {
            continue;
        }
        let help = arg
            .get_help()
            .map(|h| markdown_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("| `{}` | {} |\n", option_label(arg), help));
    }

    out.push_str("\n## Views\n\n| View | Tab |\n|------|-----|\n");
    for view in ViewName::ALL {
        out.push_str(&format!("| `{}` | {} |\n", view.as_str(), view.title()));
    }
    out
}
