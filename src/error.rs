//! Error taxonomy for loading, deriving and analysing order tables.
//!
//! `DataSourceError` is fatal for a session, `TimestampParseError` is a
//! recoverable data-quality finding, and `InsufficientDataError` makes a
//! single statistic undefined.

use polars::prelude::PolarsError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The source could not be turned into a record table.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("data source not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("column '{column}' must be {expected}, found {found}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: String,
    },
}

/// Some values of a timestamp column could not be parsed. The affected
/// rows are excluded from time-based views instead of failing the load.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{rows} value(s) in '{column}' are not valid timestamps (first: '{example}')")]
pub struct TimestampParseError {
    pub column: String,
    pub rows: usize,
    pub example: String,
}

/// Not enough data for a statistic. The statistic is reported as undefined.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("insufficient data for {context}: need at least {required}, found {found}")]
pub struct InsufficientDataError {
    pub context: String,
    pub required: usize,
    pub found: usize,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("column '{column}' must be {expected}, found {found}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_every_column() {
        let err = DataSourceError::MissingColumns {
            columns: vec!["price".into(), "payment_type".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required columns: price, payment_type"
        );
    }

    #[test]
    fn timestamp_error_carries_context() {
        let err = TimestampParseError {
            column: "order_purchase_timestamp".into(),
            rows: 3,
            example: "not a date".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("order_purchase_timestamp"));
        assert!(msg.contains('3'));
        assert!(msg.contains("not a date"));
    }

    #[test]
    fn data_source_error_converts_into_crate_error() {
        let err: Error = DataSourceError::NotFound {
            path: PathBuf::from("orders.csv"),
        }
        .into();
        assert!(matches!(err, Error::DataSource(_)));
        assert!(err.to_string().contains("orders.csv"));
    }
}
