//! Calendar attributes derived from the purchase timestamp.
//!
//! Every derivation re-parses the timestamp column and returns a new table,
//! so deriving twice or out of order always yields the same values.
//! Month and weekday names come from polars' strftime, which formats in
//! English regardless of locale.

use crate::error::{Result, TimestampParseError};
use crate::table::{columns, RecordTable};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Layouts tried in order; the first that matches wins.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d",
];

const MICROSECONDS_PER_DAY: i64 = 86_400_000_000;

const FAILED: &str = "failed";

/// What to do with orders delivered before they were purchased.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeDeliveryPolicy {
    /// Keep negative delivery times as they are
    #[default]
    Retain,
    /// Treat negative delivery times as missing
    Exclude,
}

/// `column` parsed to a microsecond datetime. Values matching none of the
/// accepted layouts become null.
pub fn timestamp_expr(column: &str) -> Expr {
    let raw = col(column).cast(DataType::String);
    let attempts: Vec<Expr> = TIMESTAMP_FORMATS
        .into_iter()
        .map(|fmt| {
            let opts = StrptimeOptions {
                format: Some(PlSmallStr::from_static(fmt)),
                strict: false,
                exact: true,
                cache: true,
            };
            raw.clone().str().to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                opts,
                lit(PlSmallStr::from_static("raise")),
            )
        })
        .collect();
    coalesce(&attempts)
}

/// Parsed timestamps of one column, row-aligned. Null and empty cells
/// are null without a warning; non-empty unparsable cells are null and
/// counted in the returned `TimestampParseError`.
pub fn parse_timestamp_column(
    table: &RecordTable,
    column: &str,
) -> Result<(Series, Option<TimestampParseError>)> {
    let raw = col(column).cast(DataType::String);
    let parsed = timestamp_expr(column);
    let failed = raw
        .clone()
        .is_not_null()
        .and(raw.neq(lit("")))
        .and(parsed.clone().is_null());

    let out = table
        .frame()
        .clone()
        .lazy()
        .select([parsed.alias(column), failed.alias(FAILED)])
        .collect()?;

    let mask = out.column(FAILED)?.bool()?.clone();
    let rows = mask.iter().filter(|f| *f == Some(true)).count();
    let error = if rows > 0 {
        let bad = table
            .series(column)?
            .cast(&DataType::String)?
            .filter(&mask)?;
        let example = bad.str()?.get(0).unwrap_or_default().to_string();
        let err = TimestampParseError {
            column: column.to_string(),
            rows,
            example,
        };
        warn!(
            column = %err.column,
            rows = err.rows,
            example = %err.example,
            "unparsable timestamps excluded from time-based views"
        );
        Some(err)
    } else {
        None
    };

    let timestamps = out.column(column)?.as_materialized_series().clone();
    Ok((timestamps, error))
}

/// Adds `name`, computed by `attribute` from the parsed purchase timestamp.
fn derive_from_purchase(
    table: &RecordTable,
    name: &str,
    attribute: impl FnOnce(Expr) -> Expr,
) -> Result<RecordTable> {
    let (timestamps, error) = parse_timestamp_column(table, columns::PURCHASE_TIMESTAMP)?;
    let derived = DataFrame::new(vec![timestamps.into_column()])?
        .lazy()
        .select([attribute(col(columns::PURCHASE_TIMESTAMP)).alias(name)])
        .collect()?;
    let series = derived.column(name)?.as_materialized_series().clone();
    debug!(column = name, rows = series.len(), "derived time attribute");
    table.with_derived(series, error)
}

/// Adds `year` (Int32).
pub fn derive_year(table: &RecordTable) -> Result<RecordTable> {
    derive_from_purchase(table, columns::YEAR, |ts| ts.dt().year())
}

/// Adds `month` with the full English month name ("November").
pub fn derive_month(table: &RecordTable) -> Result<RecordTable> {
    derive_from_purchase(table, columns::MONTH, |ts| ts.dt().to_string("%B"))
}

/// Adds `month_year` as abbreviated month and year ("Nov2017").
pub fn derive_month_year(table: &RecordTable) -> Result<RecordTable> {
    derive_from_purchase(table, columns::MONTH_YEAR, |ts| {
        ts.dt().to_string("%b%Y")
    })
}

/// Adds `weekday` with the full English weekday name ("Monday").
pub fn derive_weekday(table: &RecordTable) -> Result<RecordTable> {
    derive_from_purchase(table, columns::WEEKDAY, |ts| ts.dt().to_string("%A"))
}

pub fn derive_all(table: &RecordTable) -> Result<RecordTable> {
    let table = derive_year(table)?;
    let table = derive_month(&table)?;
    let table = derive_month_year(&table)?;
    derive_weekday(&table)
}

/// Adds `delivery_time` (Int64, whole days floored like a pandas
/// timedelta's `.days`). Undelivered orders stay null so they never count
/// as zero-day deliveries.
pub fn derive_delivery_time(
    table: &RecordTable,
    policy: NegativeDeliveryPolicy,
) -> Result<RecordTable> {
    let (purchased, purchase_err) = parse_timestamp_column(table, columns::PURCHASE_TIMESTAMP)?;
    let (delivered, delivered_err) = parse_timestamp_column(table, columns::DELIVERED_TIMESTAMP)?;

    let elapsed = (col(columns::DELIVERED_TIMESTAMP) - col(columns::PURCHASE_TIMESTAMP))
        .cast(DataType::Int64)
        .floor_div(lit(MICROSECONDS_PER_DAY));
    let days = DataFrame::new(vec![purchased.into_column(), delivered.into_column()])?
        .lazy()
        .select([elapsed.alias(columns::DELIVERY_TIME)])
        .collect()?;

    let negative = days
        .column(columns::DELIVERY_TIME)?
        .i64()?
        .iter()
        .flatten()
        .filter(|d| *d < 0)
        .count();
    let days = if negative > 0 {
        warn!(rows = negative, ?policy, "orders delivered before purchase");
        match policy {
            NegativeDeliveryPolicy::Retain => days,
            NegativeDeliveryPolicy::Exclude => {
                let d = col(columns::DELIVERY_TIME);
                days.lazy()
                    .select([when(d.clone().lt(lit(0)))
                        .then(lit(NULL))
                        .otherwise(d)
                        .alias(columns::DELIVERY_TIME)])
                    .collect()?
            }
        }
    } else {
        days
    };

    let series = days
        .column(columns::DELIVERY_TIME)?
        .as_materialized_series()
        .clone();
    let out = table.with_derived(series, delivered_err)?;
    Ok(match purchase_err {
        Some(err) => out.with_warning(err),
        None => out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(stamps: &[Option<&str>]) -> RecordTable {
        RecordTable::from(df!(columns::PURCHASE_TIMESTAMP => stamps).unwrap())
    }

    fn years(table: &RecordTable) -> Vec<Option<f64>> {
        derive_year(table)
            .unwrap()
            .numeric_values(columns::YEAR)
            .unwrap()
    }

    #[test]
    fn parses_common_layouts() {
        let t = table(&[
            Some("2017-10-02 10:56:33"),
            Some("2017-10-02 10:56:33.000000"),
            Some("2017-10-02T10:56:33"),
            Some("2017-10-02"),
            Some("02/10/2017"),
        ]);
        let (parsed, error) = parse_timestamp_column(&t, columns::PURCHASE_TIMESTAMP).unwrap();
        assert_eq!(parsed.null_count(), 1);
        assert_eq!(error.unwrap().example, "02/10/2017");
    }

    #[test]
    fn year_counts_scenario() {
        let t = table(&[
            Some("2016-03-01 00:00:00"),
            Some("2017-11-20 00:00:00"),
            Some("2017-11-21 00:00:00"),
            Some("2018-01-05 00:00:00"),
        ]);
        assert_eq!(
            years(&t),
            vec![Some(2016.0), Some(2017.0), Some(2017.0), Some(2018.0)]
        );
    }

    #[test]
    fn derive_year_is_idempotent() {
        let t = table(&[Some("2017-11-20 08:00:00"), None, Some("2018-01-05")]);
        let once = derive_year(&t).unwrap();
        let twice = derive_year(&once).unwrap();
        assert_eq!(
            once.numeric_values(columns::YEAR).unwrap(),
            twice.numeric_values(columns::YEAR).unwrap()
        );
        assert_eq!(once.column_names(), twice.column_names());
    }

    #[test]
    fn derive_year_replaces_a_stale_column() {
        let mut df = df!(columns::PURCHASE_TIMESTAMP => &["2017-11-20 08:00:00"]).unwrap();
        df.with_column(Series::new(columns::YEAR.into(), &[1999_i32]))
            .unwrap();
        assert_eq!(years(&RecordTable::from(df)), vec![Some(2017.0)]);
    }

    #[test]
    fn names_are_english() {
        let t = derive_all(&table(&[Some("2017-11-20 08:00:00")])).unwrap();
        assert_eq!(
            t.text_values(columns::MONTH).unwrap(),
            vec![Some("November".to_string())]
        );
        assert_eq!(
            t.text_values(columns::MONTH_YEAR).unwrap(),
            vec![Some("Nov2017".to_string())]
        );
        assert_eq!(
            t.text_values(columns::WEEKDAY).unwrap(),
            vec![Some("Monday".to_string())]
        );
    }

    #[test]
    fn unparsable_rows_are_null_and_reported() {
        let t = table(&[Some("2017-11-20"), Some("garbage"), Some("also bad"), None, Some("")]);
        let derived = derive_year(&t).unwrap();
        assert_eq!(
            derived.numeric_values(columns::YEAR).unwrap(),
            vec![Some(2017.0), None, None, None, None]
        );
        assert_eq!(
            derived.warnings(),
            &[TimestampParseError {
                column: columns::PURCHASE_TIMESTAMP.to_string(),
                rows: 2,
                example: "garbage".to_string(),
            }]
        );
        // recomputing does not duplicate the finding
        let again = derive_month(&derived).unwrap();
        assert_eq!(again.warnings().len(), 1);
    }

    #[test]
    fn delivery_days_floor_like_timedelta() {
        let df = df!(
            columns::PURCHASE_TIMESTAMP => &["2017-10-02 10:00:00"; 4],
            columns::DELIVERED_TIMESTAMP => &[
                Some("2017-10-02 20:00:00"),
                Some("2017-10-02 09:00:00"),
                Some("2017-10-10 09:59:59"),
                None,
            ]
        )
        .unwrap();
        let t = derive_delivery_time(&RecordTable::from(df), NegativeDeliveryPolicy::Retain)
            .unwrap();
        assert_eq!(
            t.numeric_values(columns::DELIVERY_TIME).unwrap(),
            vec![Some(0.0), Some(-1.0), Some(7.0), None]
        );
    }

    #[test]
    fn delivery_time_policy() {
        let df = df!(
            columns::PURCHASE_TIMESTAMP => &["2017-10-02 10:00:00", "2017-10-02 10:00:00", "2017-10-05 10:00:00"],
            columns::DELIVERED_TIMESTAMP => &[Some("2017-10-04 11:00:00"), None, Some("2017-10-04 10:00:00")]
        )
        .unwrap();
        let t = RecordTable::from(df);

        let retained = derive_delivery_time(&t, NegativeDeliveryPolicy::Retain).unwrap();
        assert_eq!(
            retained.numeric_values(columns::DELIVERY_TIME).unwrap(),
            vec![Some(2.0), None, Some(-1.0)]
        );

        let excluded = derive_delivery_time(&t, NegativeDeliveryPolicy::Exclude).unwrap();
        assert_eq!(
            excluded.numeric_values(columns::DELIVERY_TIME).unwrap(),
            vec![Some(2.0), None, None]
        );

        // a retained column is replaced, not reused
        let again = derive_delivery_time(&retained, NegativeDeliveryPolicy::Exclude).unwrap();
        assert_eq!(
            again.numeric_values(columns::DELIVERY_TIME).unwrap(),
            vec![Some(2.0), None, None]
        );
    }
}
