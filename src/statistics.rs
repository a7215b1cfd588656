//! Correlation, covariance and distribution summaries over numeric columns.
//!
//! Every statistic uses pairwise-complete observations: a row contributes to
//! a pair only when both values are present. NaN counts as missing.

use crate::error::{Error, InsufficientDataError, Result};
use crate::table::RecordTable;
use serde::Serialize;
use tracing::debug;

/// Maximum number of points returned for a scatter plot
pub const SCATTER_ROW_LIMIT: usize = 10_000;

/// Square, symmetric matrix indexed by numeric column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
    /// Pairwise-complete row count behind each cell
    pub sample_sizes: Vec<Vec<usize>>,
}

impl Matrix {
    pub fn get(&self, row: &str, column: &str) -> Option<Option<f64>> {
        let r = self.columns.iter().position(|c| c == row)?;
        let c = self.columns.iter().position(|c| c == column)?;
        Some(self.cells[r][c])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoints {
    pub x_column: String,
    pub y_column: String,
    pub points: Vec<(f64, f64)>,
    /// More complete rows existed than `SCATTER_ROW_LIMIT`
    pub truncated: bool,
}

/// Box-plot summary with linearly interpolated quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Rows where both values are present, as two aligned vectors.
fn complete_pairs(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .unzip()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample covariance (N-1). Undefined below two observations.
fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let sum: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| (a - mx) * (b - my))
        .sum();
    Some(sum / (n - 1) as f64)
}

/// Pearson correlation. Undefined below two observations or when either
/// side has zero variance.
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);

    let numerator: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| (a - mx) * (b - my))
        .sum();
    let var_x: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    let var_y: f64 = y.iter().map(|v| (v - my).powi(2)).sum();

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((numerator / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

fn pairwise_matrix(
    table: &RecordTable,
    context: &str,
    statistic: fn(&[f64], &[f64]) -> Option<f64>,
) -> Result<Matrix> {
    let columns = table.numeric_column_names();
    if columns.len() < 2 {
        return Err(InsufficientDataError {
            context: context.to_string(),
            required: 2,
            found: columns.len(),
        }
        .into());
    }

    let values = columns
        .iter()
        .map(|c| table.numeric_values(c))
        .collect::<Result<Vec<_>>>()?;

    let n = columns.len();
    let mut cells = vec![vec![None; n]; n];
    let mut sample_sizes = vec![vec![0; n]; n];

    for i in 0..n {
        for j in i..n {
            let (x, y) = complete_pairs(&values[i], &values[j]);
            let value = statistic(&x, &y);
            cells[i][j] = value;
            cells[j][i] = value;
            sample_sizes[i][j] = x.len();
            sample_sizes[j][i] = x.len();
        }
    }

    debug!(columns = n, context, "computed pairwise matrix");
    Ok(Matrix {
        columns,
        cells,
        sample_sizes,
    })
}

/// Pearson correlation for every pair of numeric columns, self pairs
/// included. Needs at least two numeric columns.
pub fn correlation_matrix(table: &RecordTable) -> Result<Matrix> {
    pairwise_matrix(table, "correlation matrix", pearson)
}

/// Sample covariance for every pair of numeric columns.
pub fn covariance_matrix(table: &RecordTable) -> Result<Matrix> {
    pairwise_matrix(table, "covariance matrix", covariance)
}

/// Sample covariance of two named numeric columns. Fewer than two rows
/// with both values is an `InsufficientDataError` naming the pair.
pub fn pairwise_covariance(table: &RecordTable, a: &str, b: &str) -> Result<Option<f64>> {
    let (x, y) = complete_pairs(&table.numeric_values(a)?, &table.numeric_values(b)?);
    if x.len() < 2 {
        return Err(InsufficientDataError {
            context: format!("covariance({}, {})", a, b),
            required: 2,
            found: x.len(),
        }
        .into());
    }
    Ok(covariance(&x, &y))
}

/// Pearson correlation of two named numeric columns.
pub fn pairwise_correlation(table: &RecordTable, a: &str, b: &str) -> Result<Option<f64>> {
    let (x, y) = complete_pairs(&table.numeric_values(a)?, &table.numeric_values(b)?);
    Ok(pearson(&x, &y))
}

/// `(x, y)` points for a scatter plot, in row order, limited to
/// `SCATTER_ROW_LIMIT`.
pub fn scatter_points(table: &RecordTable, x: &str, y: &str) -> Result<ScatterPoints> {
    let xs = table.numeric_values(x)?;
    let ys = table.numeric_values(y)?;

    let mut points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect();

    let truncated = points.len() > SCATTER_ROW_LIMIT;
    points.truncate(SCATTER_ROW_LIMIT);

    Ok(ScatterPoints {
        x_column: x.to_string(),
        y_column: y.to_string(),
        points,
        truncated,
    })
}

/// Percentile of sorted data with linear interpolation between ranks.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn five_number_summary(values: &[f64]) -> Result<FiveNumberSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(Error::InsufficientData(InsufficientDataError {
            context: "five-number summary".to_string(),
            required: 1,
            found: 0,
        }));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(FiveNumberSummary {
        min: sorted[0],
        q1: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q3: percentile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}
