//! Plain-text rendering of bundles for terminal output.

use crate::aggregate::{AggregateView, PivotView};
use crate::statistics::{FiveNumberSummary, Matrix, ScatterPoints};
use crate::views::{Bundle, ViewItem};
use std::fmt::Write;

/// Scatter points printed before the listing is cut short
const SCATTER_PREVIEW: usize = 10;

fn cell(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/// Decimal places for a series: whole numbers print without a fraction.
fn decimals_for(values: &[Option<f64>]) -> usize {
    if values.iter().flatten().all(|v| v.fract() == 0.0) {
        0
    } else {
        2
    }
}

fn write_series(out: &mut String, view: &AggregateView) {
    let pairs = view.pairs();
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let decimals = decimals_for(&view.values());
    let _ = writeln!(out, "  {:<width$}  {}", view.key_columns.join(", "), view.measure);
    for (key, value) in pairs {
        let _ = writeln!(out, "  {:<width$}  {}", key, cell(value, decimals));
    }
}

fn write_grid(
    out: &mut String,
    corner: &str,
    columns: &[String],
    rows: &[(String, Vec<Option<f64>>)],
) {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain(std::iter::once(corner.len()))
        .max()
        .unwrap_or(0);
    let column_width = columns.iter().map(|c| c.len()).max().unwrap_or(0).max(8);

    let _ = write!(out, "  {:<label_width$}", corner);
    for column in columns {
        let _ = write!(out, "  {:>column_width$}", column);
    }
    out.push('\n');

    let all: Vec<Option<f64>> = rows.iter().flat_map(|(_, r)| r.iter().copied()).collect();
    let decimals = decimals_for(&all);
    for (label, values) in rows {
        let _ = write!(out, "  {:<label_width$}", label);
        for value in values {
            let _ = write!(out, "  {:>column_width$}", cell(*value, decimals));
        }
        out.push('\n');
    }
}

fn write_pivot(out: &mut String, pivot: &PivotView) {
    let columns: Vec<String> = pivot.column_keys.iter().map(|k| k.to_string()).collect();
    let rows: Vec<(String, Vec<Option<f64>>)> = pivot
        .row_keys
        .iter()
        .zip(pivot.cells.iter())
        .map(|(k, r)| (k.to_string(), r.clone()))
        .collect();
    let corner = format!("{} \\ {}", pivot.row_column, pivot.column_column);
    write_grid(out, &corner, &columns, &rows);
}

fn write_matrix(out: &mut String, matrix: &Matrix) {
    let rows: Vec<(String, Vec<Option<f64>>)> = matrix
        .columns
        .iter()
        .cloned()
        .zip(matrix.cells.iter().cloned())
        .collect();
    write_grid(out, "", &matrix.columns, &rows);
}

fn write_summary(out: &mut String, s: &FiveNumberSummary) {
    let _ = writeln!(
        out,
        "  min {:.2}  q1 {:.2}  median {:.2}  q3 {:.2}  max {:.2}",
        s.min, s.q1, s.median, s.q3, s.max
    );
}

fn write_scatter(out: &mut String, scatter: &ScatterPoints) {
    let _ = writeln!(
        out,
        "  {} points ({} vs {}){}",
        scatter.points.len(),
        scatter.x_column,
        scatter.y_column,
        if scatter.truncated { ", truncated" } else { "" }
    );
    for (x, y) in scatter.points.iter().take(SCATTER_PREVIEW) {
        let _ = writeln!(out, "  {:>12.2}  {:>12.2}", x, y);
    }
    if scatter.points.len() > SCATTER_PREVIEW {
        let _ = writeln!(out, "  ...");
    }
}

/// Render a bundle as human readable text.
pub fn bundle_to_text(bundle: &Bundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", bundle.title);

    for item in &bundle.items {
        let _ = writeln!(out, "\n[{}]", item.label);
        match &item.item {
            ViewItem::Series(view) => write_series(&mut out, view),
            ViewItem::Pivot(pivot) => write_pivot(&mut out, pivot),
            ViewItem::Matrix(matrix) => write_matrix(&mut out, matrix),
            ViewItem::Scalar(scalar) => {
                let _ = writeln!(out, "  {}", scalar.display);
            }
            ViewItem::Values(values) => {
                let _ = writeln!(out, "  {}", values.join(", "));
            }
            ViewItem::Summary(summary) => write_summary(&mut out, summary),
            ViewItem::Scatter(scatter) => write_scatter(&mut out, scatter),
            ViewItem::Undefined { reason } => {
                let _ = writeln!(out, "  undefined: {}", reason);
            }
        }
    }

    if !bundle.warnings.is_empty() {
        out.push_str("\nwarnings:\n");
        for warning in &bundle.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }
    out
}
