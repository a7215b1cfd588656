//! Group-by, ranking and pivot engine over a [`RecordTable`].
//!
//! Grouping drops rows with a null in any key column. Mean and sum skip
//! null measure values but keep the group: a group with no measure values
//! reports `None`, never zero.

use crate::error::{Error, Result};
use crate::table::{series_text, RecordTable};
use polars::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// One component of a group key. Integer columns group as `Int` so that
/// years and other codes sort numerically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

/// A (possibly composite) group key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    pub fn first(&self) -> Option<&KeyValue> {
        self.0.first()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|k| k.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl<T: Into<KeyValue>> From<T> for GroupKey {
    fn from(value: T) -> Self {
        GroupKey(vec![value.into()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    Count,
    Mean(String),
    Sum(String),
}

impl Measure {
    pub fn mean(column: &str) -> Self {
        Measure::Mean(column.to_string())
    }

    pub fn sum(column: &str) -> Self {
        Measure::Sum(column.to_string())
    }

    pub fn label(&self) -> String {
        match self {
            Measure::Count => "count".to_string(),
            Measure::Mean(c) => format!("mean({})", c),
            Measure::Sum(c) => format!("sum({})", c),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    #[default]
    ByKeyAscending,
    ByMeasureDescending,
    ByMeasureAscending,
}

/// How a pivot fills (row, column) combinations that have no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    Zero,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateEntry {
    pub key: GroupKey,
    pub value: Option<f64>,
}

/// Ordered mapping from group key to measure value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub key_columns: Vec<String>,
    pub measure: String,
    pub order: Order,
    pub entries: Vec<AggregateEntry>,
}

/// Nulls sort last in both directions.
fn compare_measure(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

impl AggregateView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` when the key is absent, `Some(None)` when present but undefined.
    pub fn get(&self, key: &GroupKey) -> Option<Option<f64>> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.value)
    }

    pub fn keys(&self) -> Vec<&GroupKey> {
        self.entries.iter().map(|e| &e.key).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// `(label, value)` pairs in view order, for bar/line/pie rendering
    pub fn pairs(&self) -> Vec<(String, Option<f64>)> {
        self.entries
            .iter()
            .map(|e| (e.key.to_string(), e.value))
            .collect()
    }

    /// Re-order the entries. Sorting is stable, so measure ties keep their
    /// current relative order.
    pub fn sorted(mut self, order: Order) -> Self {
        match order {
            Order::ByKeyAscending => self.entries.sort_by(|a, b| a.key.cmp(&b.key)),
            Order::ByMeasureDescending => self
                .entries
                .sort_by(|a, b| compare_measure(a.value, b.value, true)),
            Order::ByMeasureAscending => self
                .entries
                .sort_by(|a, b| compare_measure(a.value, b.value, false)),
        }
        self.order = order;
        self
    }
}

/// Measure values with NaN folded into null
fn measure_values(column: &str) -> Expr {
    col(column).cast(DataType::Float64).fill_nan(lit(NULL))
}

impl Measure {
    /// Per-group aggregation expression, aliased to the measure label.
    fn agg_expr(&self) -> Expr {
        let expr = match self {
            Measure::Count => len(),
            Measure::Mean(c) => measure_values(c).mean(),
            // polars sums a group without values to zero
            Measure::Sum(c) => when(measure_values(c).count().gt(lit(0)))
                .then(measure_values(c).sum())
                .otherwise(lit(NULL)),
        };
        expr.alias(self.label())
    }
}

pub fn group_and_measure(
    table: &RecordTable,
    group_key: &[&str],
    measure: &Measure,
    order: Order,
) -> Result<AggregateView> {
    if group_key.is_empty() {
        return Err(Error::InvalidArgument(
            "group key needs at least one column".to_string(),
        ));
    }
    for column in group_key {
        table.series(column)?;
    }
    if let Measure::Mean(c) | Measure::Sum(c) = measure {
        table.require_numeric(c)?;
    }

    let keys: Vec<Expr> = group_key.iter().map(|c| col(*c)).collect();
    let mut lf = table.frame().clone().lazy();
    for column in group_key {
        lf = lf.filter(col(*column).is_not_null());
    }
    let grouped = lf
        .group_by(keys.clone())
        .agg([measure.agg_expr()])
        .sort_by_exprs(keys, SortMultipleOptions::default())
        .collect()?;
    let grouped = RecordTable::from(grouped);

    let key_values = group_key
        .iter()
        .map(|c| grouped.key_values(c))
        .collect::<Result<Vec<_>>>()?;
    let values = grouped.numeric_values(&measure.label())?;

    let entries = values
        .into_iter()
        .enumerate()
        .map(|(row, value)| AggregateEntry {
            key: GroupKey(
                key_values
                    .iter()
                    .filter_map(|column| column[row].clone())
                    .collect(),
            ),
            value,
        })
        .collect();

    let view = AggregateView {
        key_columns: group_key.iter().map(|c| c.to_string()).collect(),
        measure: measure.label(),
        order: Order::ByKeyAscending,
        entries,
    };
    debug!(groups = view.len(), measure = %view.measure, "grouped");
    Ok(view.sorted(order))
}

/// The `n` entries with the largest measure. Ties keep the view's current
/// order; `n` larger than the view returns every entry.
pub fn top_n(view: &AggregateView, n: usize) -> AggregateView {
    let mut ranked = view.clone().sorted(Order::ByMeasureDescending);
    ranked.entries.truncate(n);
    ranked
}

/// Each entry's share of the view total. Undefined entries stay undefined;
/// a zero total makes every share undefined.
pub fn distribution(view: &AggregateView) -> AggregateView {
    let total: f64 = view.entries.iter().filter_map(|e| e.value).sum();
    let mut shares = view.clone();
    shares.measure = format!("share({})", view.measure);
    for entry in &mut shares.entries {
        entry.value = entry.value.filter(|_| total != 0.0).map(|v| v / total);
    }
    shares
}

pub fn round_view(view: &AggregateView, decimals: u32) -> AggregateView {
    let mut rounded = view.clone();
    for entry in &mut rounded.entries {
        entry.value = entry.value.map(|v| round_to(v, decimals));
    }
    rounded
}

/// Two-dimensional aggregate: sorted row keys × sorted column keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotView {
    pub row_column: String,
    pub column_column: String,
    pub measure: String,
    pub fill: FillPolicy,
    pub row_keys: Vec<KeyValue>,
    pub column_keys: Vec<KeyValue>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotView {
    pub fn get(&self, row: &KeyValue, column: &KeyValue) -> Option<Option<f64>> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        let c = self.column_keys.iter().position(|k| k == column)?;
        Some(self.cells[r][c])
    }
}

pub fn pivot(
    table: &RecordTable,
    row_key: &str,
    column_key: &str,
    measure: &Measure,
    fill: FillPolicy,
) -> Result<PivotView> {
    let grouped = group_and_measure(table, &[row_key, column_key], measure, Order::ByKeyAscending)?;

    let mut cells_by_key: HashMap<(&KeyValue, &KeyValue), Option<f64>> = HashMap::new();
    let mut rows = BTreeSet::new();
    let mut cols = BTreeSet::new();
    for entry in &grouped.entries {
        if let [row, column] = entry.key.0.as_slice() {
            rows.insert(row);
            cols.insert(column);
            cells_by_key.insert((row, column), entry.value);
        }
    }

    let missing = match fill {
        FillPolicy::Zero => Some(0.0),
        FillPolicy::Absent => None,
    };
    let cells: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|row| {
            cols.iter()
                .map(|column| {
                    cells_by_key
                        .get(&(*row, *column))
                        .copied()
                        .unwrap_or(missing)
                })
                .collect()
        })
        .collect();

    Ok(PivotView {
        row_column: row_key.to_string(),
        column_column: column_key.to_string(),
        measure: grouped.measure.clone(),
        fill,
        row_keys: rows.into_iter().cloned().collect(),
        column_keys: cols.into_iter().cloned().collect(),
        cells,
    })
}

/// Rows whose `column` value is one of `keys`.
pub fn filter_by_keys(
    table: &RecordTable,
    column: &str,
    keys: &[KeyValue],
) -> Result<RecordTable> {
    let wanted: HashSet<&KeyValue> = keys.iter().collect();
    let mask: Vec<bool> = table
        .key_values(column)?
        .iter()
        .map(|v| v.as_ref().is_some_and(|k| wanted.contains(k)))
        .collect();
    table.filter_rows(&mask)
}

/// Distinct non-null values in order of first appearance.
pub fn unique_values(table: &RecordTable, column: &str) -> Result<Vec<String>> {
    let unique = table.series(column)?.drop_nulls().unique_stable()?;
    Ok(series_text(&unique)?.into_iter().flatten().collect())
}

pub fn n_unique(table: &RecordTable, column: &str) -> Result<usize> {
    Ok(table.series(column)?.drop_nulls().n_unique()?)
}

/// A reproducible sample of `n` values: every k-th row starting at an
/// offset derived from `seed`.
pub fn sample_values(
    table: &RecordTable,
    column: &str,
    n: usize,
    seed: u64,
) -> Result<Vec<Option<String>>> {
    let series = table.series(column)?;
    let total = series.len();
    if total <= n {
        return series_text(series);
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let step = total / n;
    let start = (seed as usize) % step;
    let indices: Vec<u32> = (0..n).map(|i| (start + i * step) as u32).collect();
    let indices = UInt32Chunked::new("indices".into(), indices);
    series_text(&series.take(&indices)?)
}
