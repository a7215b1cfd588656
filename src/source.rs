//! Reading order tables from delimited text and Parquet files.

use crate::config::AppConfig;
use crate::error::DataSourceError;
use crate::table::RecordTable;
use crate::{Args, CompressionFormat, FileFormat};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Rows inspected when inferring column types. Polars defaults to 100,
/// which is too few for order exports with sparse numeric columns.
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

/// How to read a source file. Unset fields fall back to detection from
/// the file extension.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub compression: Option<CompressionFormat>,
    pub format: Option<FileFormat>,
    pub infer_schema_length: usize,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self {
            delimiter: None,
            has_header: None,
            compression: None,
            format: None,
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Create OpenOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let mut opts = OpenOptions::new();

        opts.delimiter = args.delimiter.or(config.file_loading.delimiter);

        // CLI flag is "no header", config is "has header"
        opts.has_header = args
            .no_header
            .map(|no_header| !no_header)
            .or(config.file_loading.has_header);

        opts.compression = args.compression.or_else(|| {
            config
                .file_loading
                .compression
                .as_deref()
                .and_then(CompressionFormat::from_name)
        });

        opts.format = args.format;

        if let Some(n) = config.file_loading.infer_schema_length {
            opts.infer_schema_length = n;
        }

        opts
    }
}

impl From<&Args> for OpenOptions {
    fn from(args: &Args) -> Self {
        Self::from_args_and_config(args, &AppConfig::default())
    }
}

/// Load an order table and check its column contract.
pub fn load(path: &Path, options: &OpenOptions) -> Result<RecordTable, DataSourceError> {
    if !path.exists() {
        return Err(DataSourceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| DataSourceError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    debug!(path = %path.display(), ?format, "loading order table");

    let df = match format {
        FileFormat::Parquet => read_parquet(path)?,
        _ => read_delimited(path, format, options)?,
    };
    debug!(rows = df.height(), columns = df.width(), "loaded");

    RecordTable::try_from_orders(df)
}

fn malformed(path: &Path) -> impl FnOnce(PolarsError) -> DataSourceError + '_ {
    move |source| DataSourceError::Malformed {
        path: path.to_path_buf(),
        source,
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataSourceError + '_ {
    move |source| DataSourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_parquet(path: &Path) -> Result<DataFrame, DataSourceError> {
    let file = File::open(path).map_err(io_error(path))?;
    ParquetReader::new(file).finish().map_err(malformed(path))
}

fn csv_options(format: FileFormat, options: &OpenOptions) -> CsvReadOptions {
    let mut read_options = CsvReadOptions::default();
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    read_options.infer_schema_length = Some(options.infer_schema_length);

    let separator = options
        .delimiter
        .or_else(|| format.delimiter())
        .unwrap_or(b',');
    // Timestamps stay text; the time deriver parses them itself
    read_options.map_parse_options(|opts| {
        opts.with_separator(separator)
            .with_try_parse_dates(false)
    })
}

/// Decompress a whole file into memory. Polars reads gzip and zstd itself;
/// bzip2 and xz are decoded here.
fn decompress(path: &Path, compression: CompressionFormat) -> Result<Vec<u8>, DataSourceError> {
    let file = File::open(path).map_err(io_error(path))?;
    let mut reader: Box<dyn Read> = match compression {
        CompressionFormat::Bzip2 => Box::new(bzip2::read::BzDecoder::new(BufReader::new(file))),
        CompressionFormat::Xz => Box::new(xz2::read::XzDecoder::new(BufReader::new(file))),
        CompressionFormat::Gzip | CompressionFormat::Zstd => Box::new(BufReader::new(file)),
    };
    let mut decompressed = Vec::new();
    reader
        .read_to_end(&mut decompressed)
        .map_err(io_error(path))?;
    Ok(decompressed)
}

fn read_delimited(
    path: &Path,
    format: FileFormat,
    options: &OpenOptions,
) -> Result<DataFrame, DataSourceError> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));
    let read_options = csv_options(format, options);

    match compression {
        Some(compression @ (CompressionFormat::Bzip2 | CompressionFormat::Xz)) => {
            debug!(?compression, "decompressing in memory");
            let decompressed = decompress(path, compression)?;
            CsvReader::new(Cursor::new(decompressed))
                .with_options(read_options)
                .finish()
                .map_err(malformed(path))
        }
        _ => read_options
            .try_into_reader_with_file_path(Some(path.into()))
            .map_err(malformed(path))?
            .finish()
            .map_err(malformed(path)),
    }
}
