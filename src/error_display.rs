//! User-facing error message formatting.
//!
//! Matches on typed errors (crate errors, PolarsError variants,
//! io::ErrorKind) rather than parsing strings, so messages stay short and
//! actionable.

use crate::error::{DataSourceError, Error};
use polars::prelude::PolarsError;
use std::io;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check the header row and the delimiter.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::ComputeError(msg) => format!("Could not parse the file: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return match context {
                Some(_) => format!("I/O error: {}", msg),
                None => msg,
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

pub fn user_message_from_data_source(err: &DataSourceError) -> String {
    match err {
        DataSourceError::NotFound { path } => {
            format!("{} does not exist.", path.display())
        }
        DataSourceError::Io { path, source } => {
            format!("Failed to load {}: {}", path.display(), user_message_from_io(source, None))
        }
        DataSourceError::Malformed { path, source } => format!(
            "Failed to load {}: {}",
            path.display(),
            user_message_from_polars(source)
        ),
        DataSourceError::UnsupportedFormat { path } => format!(
            "Unsupported file format: {}. Use --format to choose csv, tsv, psv or parquet.",
            path.display()
        ),
        DataSourceError::MissingColumns { .. } | DataSourceError::ColumnType { .. } => {
            format!("Not an order table: {}", err)
        }
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain and reports the first error it recognises.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<DataSourceError>() {
            return user_message_from_data_source(err);
        }
        if let Some(err) = cause.downcast_ref::<Error>() {
            match err {
                Error::DataSource(e) => return user_message_from_data_source(e),
                Error::Polars(e) => return user_message_from_polars(e),
                _ => return err.to_string(),
            }
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(pe);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    let display = report.to_string();
    display
        .lines()
        .next()
        .map(str::trim)
        .unwrap_or("An error occurred")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("price".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("price"), "expected 'price', got: {}", msg);
        assert!(msg.contains("Column not found"));
    }

    #[test]
    fn test_missing_columns_message() {
        let err = DataSourceError::MissingColumns {
            columns: vec!["price".into(), "freight_value".into()],
        };
        let msg = user_message_from_data_source(&err);
        assert!(msg.contains("price, freight_value"), "got: {}", msg);
    }

    #[test]
    fn test_report_walks_to_data_source_error() {
        let err = Error::DataSource(DataSourceError::NotFound {
            path: PathBuf::from("orders.csv"),
        });
        let report = color_eyre::eyre::Report::new(err).wrap_err("loading orders");
        let msg = user_message_from_report(&report);
        assert_eq!(msg, "orders.csv does not exist.");
    }
}
