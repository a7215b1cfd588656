//! The in-memory record table and its column contract.

use crate::aggregate::KeyValue;
use crate::error::{DataSourceError, Error, Result, TimestampParseError};
use polars::prelude::*;

/// Column names of the order table. Renaming any of these upstream is a
/// breaking change.
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";
    pub const DELIVERED_TIMESTAMP: &str = "order_delivered_customer_date";
    pub const CATEGORY: &str = "product_category_name_english";
    pub const PRICE: &str = "price";
    pub const FREIGHT_VALUE: &str = "freight_value";
    pub const PRODUCT_WEIGHT: &str = "product_weight_g";
    pub const PAYMENT_TYPE: &str = "payment_type";
    pub const CUSTOMER_STATE: &str = "customer_state";

    // Derived
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const MONTH_YEAR: &str = "month_year";
    pub const WEEKDAY: &str = "weekday";
    pub const DELIVERY_TIME: &str = "delivery_time";

    pub const DERIVED: [&str; 5] = [YEAR, MONTH, MONTH_YEAR, WEEKDAY, DELIVERY_TIME];
}

pub const REQUIRED_COLUMNS: [&str; 9] = [
    columns::ORDER_ID,
    columns::PURCHASE_TIMESTAMP,
    columns::DELIVERED_TIMESTAMP,
    columns::CATEGORY,
    columns::PRICE,
    columns::FREIGHT_VALUE,
    columns::PRODUCT_WEIGHT,
    columns::PAYMENT_TYPE,
    columns::CUSTOMER_STATE,
];

/// Required columns that must hold numbers
pub const NUMERIC_COLUMNS: [&str; 3] = [
    columns::PRICE,
    columns::FREIGHT_VALUE,
    columns::PRODUCT_WEIGHT,
];

pub(crate) fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_integer_type(dtype: &DataType) -> bool {
    is_numeric_type(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Values of any series rendered as text, nulls kept in place.
pub(crate) fn series_text(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    let values = cast
        .str()?
        .iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// An immutable order table. Derivations return a new table with extra
/// columns; cloning is cheap because polars columns are reference counted.
#[derive(Debug, Clone)]
pub struct RecordTable {
    df: DataFrame,
    warnings: Vec<TimestampParseError>,
}

impl From<DataFrame> for RecordTable {
    fn from(df: DataFrame) -> Self {
        Self {
            df,
            warnings: Vec::new(),
        }
    }
}

impl RecordTable {
    /// Wrap a frame after checking the order-table column contract. A
    /// numeric column with no values at all is stored as Float64 whatever
    /// type the reader inferred for it.
    pub fn try_from_orders(mut df: DataFrame) -> Result<Self, DataSourceError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !names.iter().any(|n| n == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DataSourceError::MissingColumns { columns: missing });
        }

        for name in NUMERIC_COLUMNS {
            let column = df
                .column(name)
                .map_err(|_| DataSourceError::MissingColumns {
                    columns: vec![name.to_string()],
                })?;
            let dtype = column.dtype().clone();
            if is_numeric_type(&dtype) {
                continue;
            }
            let type_error = || DataSourceError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
                found: dtype.to_string(),
            };
            // An all-empty column is read as String
            if column.null_count() != column.len() {
                return Err(type_error());
            }
            let cast = column
                .cast(&DataType::Float64)
                .map_err(|_| type_error())?;
            df.with_column(cast).map_err(|_| type_error())?;
        }

        Ok(Self::from(df))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Data-quality findings recorded while deriving columns
    pub fn warnings(&self) -> &[TimestampParseError] {
        &self.warnings
    }

    /// Returns a new table with `series` added (or replaced, when a column
    /// with the same name exists). A warning for the same column replaces
    /// the previous one so recomputation does not accumulate duplicates.
    pub(crate) fn with_derived(
        &self,
        series: Series,
        warning: Option<TimestampParseError>,
    ) -> Result<Self> {
        let mut df = self.df.clone();
        df.with_column(series)?;
        let table = Self {
            df,
            warnings: self.warnings.clone(),
        };
        Ok(match warning {
            Some(warning) => table.with_warning(warning),
            None => table,
        })
    }

    pub(crate) fn with_warning(mut self, warning: TimestampParseError) -> Self {
        self.warnings.retain(|w| w.column != warning.column);
        self.warnings.push(warning);
        self
    }

    pub fn series(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| Error::ColumnNotFound(name.to_string()))
    }

    /// Names of all numeric columns, in table order
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.df
            .schema()
            .iter()
            .filter(|(_, dtype)| is_numeric_type(dtype))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Fails unless `name` exists and holds numbers.
    pub fn require_numeric(&self, name: &str) -> Result<&Series> {
        let series = self.series(name)?;
        if !is_numeric_type(series.dtype()) {
            return Err(Error::ColumnType {
                column: name.to_string(),
                expected: "numeric",
                found: series.dtype().to_string(),
            });
        }
        Ok(series)
    }

    /// Row-aligned numeric values; nulls and NaN are `None`.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.require_numeric(name)?;
        let cast = series.cast(&DataType::Float64)?;
        let values = cast
            .f64()?
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(values)
    }

    /// Row-aligned text values; non-string columns are rendered as text.
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        series_text(self.series(name)?)
    }

    /// Row-aligned grouping keys. Integer columns keep numeric ordering.
    pub fn key_values(&self, name: &str) -> Result<Vec<Option<KeyValue>>> {
        let series = self.series(name)?;
        if is_integer_type(series.dtype()) {
            let cast = series.cast(&DataType::Int64)?;
            let values = cast
                .i64()?
                .iter()
                .map(|v| v.map(KeyValue::Int))
                .collect();
            return Ok(values);
        }
        Ok(self
            .text_values(name)?
            .into_iter()
            .map(|v| v.map(KeyValue::Text))
            .collect())
    }

    /// The table as loaded: every derived time column removed.
    pub fn without_derived(&self) -> Result<Self> {
        let keep: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|name| !columns::DERIVED.contains(&name.as_str()))
            .collect();
        let df = self.df.select(keep)?;
        Ok(Self {
            df,
            warnings: self.warnings.clone(),
        })
    }

    /// Keep the rows where `mask` is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self> {
        let mask = BooleanChunked::from_slice("mask".into(), mask);
        let df = self.df.filter(&mask)?;
        Ok(Self {
            df,
            warnings: self.warnings.clone(),
        })
    }
}
