use color_eyre::Result;
use polars::prelude::*;
use shoplens::statistics::{
    correlation_matrix, covariance_matrix, five_number_summary, pairwise_covariance,
    scatter_points, SCATTER_ROW_LIMIT,
};
use shoplens::{Error, RecordTable};

mod common;

#[test]
fn test_correlation_matrix_computation() -> Result<()> {
    let n = 100;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|&xi| xi * 2.0 + 5.0 + (xi * 0.1)).collect();
    let z: Vec<f64> = x.iter().map(|&xi| -xi * 1.5 + 10.0).collect();

    let df = DataFrame::new(vec![
        Series::new("x".into(), x).into(),
        Series::new("y".into(), y).into(),
        Series::new("z".into(), z).into(),
    ])?;
    let table = RecordTable::from(df);

    let matrix = correlation_matrix(&table)?;
    assert_eq!(matrix.columns, vec!["x", "y", "z"]);

    let xy = matrix.get("x", "y").unwrap().unwrap();
    let xz = matrix.get("x", "z").unwrap().unwrap();
    assert!(xy > 0.99, "expected strong positive correlation, got {}", xy);
    assert!(xz < -0.99, "expected strong negative correlation, got {}", xz);

    for i in 0..matrix.len() {
        assert!(common::approx(matrix.cells[i][i].unwrap(), 1.0));
        for j in 0..matrix.len() {
            assert_eq!(matrix.cells[i][j], matrix.cells[j][i]);
            assert_eq!(matrix.sample_sizes[i][j], n);
        }
    }
    Ok(())
}

#[test]
fn test_order_table_matrices_skip_text_columns() -> Result<()> {
    let table = common::orders();
    let corr = correlation_matrix(&table)?;
    assert_eq!(
        corr.columns,
        vec!["price", "freight_value", "product_weight_g"]
    );

    let cov = covariance_matrix(&table)?;
    for i in 0..cov.len() {
        for j in 0..cov.len() {
            assert_eq!(cov.cells[i][j], cov.cells[j][i]);
        }
    }
    // o6 has no freight value
    assert_eq!(cov.sample_sizes[0][1], 9);
    Ok(())
}

#[test]
fn test_pairwise_covariance_matches_manual_computation() -> Result<()> {
    let table = common::orders();
    let price = table.numeric_values("price")?;
    let freight = table.numeric_values("freight_value")?;
    let (x, y): (Vec<f64>, Vec<f64>) = price
        .iter()
        .zip(freight.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();
    let mx = x.iter().sum::<f64>() / x.len() as f64;
    let my = y.iter().sum::<f64>() / y.len() as f64;
    let expected = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (x.len() - 1) as f64;

    let cov = pairwise_covariance(&table, "price", "freight_value")?.unwrap();
    assert!(common::approx(cov, expected));
    Ok(())
}

#[test]
fn test_covariance_of_unknown_column_errors() {
    let table = common::orders();
    assert!(matches!(
        pairwise_covariance(&table, "price", "discount"),
        Err(Error::ColumnNotFound(_))
    ));
    assert!(matches!(
        pairwise_covariance(&table, "price", "payment_type"),
        Err(Error::ColumnType { .. })
    ));
}

#[test]
fn test_scatter_points_are_capped() -> Result<()> {
    let n = SCATTER_ROW_LIMIT + 5;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
    let table = RecordTable::from(DataFrame::new(vec![
        Series::new("x".into(), x).into(),
        Series::new("y".into(), y).into(),
    ])?);

    let scatter = scatter_points(&table, "x", "y")?;
    assert_eq!(scatter.points.len(), SCATTER_ROW_LIMIT);
    assert!(scatter.truncated);
    assert_eq!(scatter.points[8], (8.0, 1.0));
    Ok(())
}

#[test]
fn test_five_number_summary_of_prices() -> Result<()> {
    let table = common::orders();
    let prices: Vec<f64> = table.numeric_values("price")?.into_iter().flatten().collect();
    let summary = five_number_summary(&prices)?;
    assert_eq!(summary.min, 10.0);
    assert_eq!(summary.median, 55.0);
    assert_eq!(summary.q1, 32.5);
    assert_eq!(summary.q3, 77.5);
    assert_eq!(summary.max, 100.0);
    Ok(())
}
