#![allow(dead_code)]

use polars::prelude::*;
use shoplens::RecordTable;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Ten orders: years 2016 (1), 2017 (3), 2018 (6); payments credit_card (7),
/// voucher (2), debit_card (1); one undelivered order and one delivered the
/// day before purchase.
pub fn orders_frame() -> DataFrame {
    df!(
        "order_id" => &["o1", "o2", "o3", "o4", "o5", "o6", "o7", "o8", "o9", "o10"],
        "order_purchase_timestamp" => &[
            "2016-10-04 09:43:32",
            "2017-11-20 10:00:00",
            "2017-11-24 12:00:00",
            "2017-05-15 08:00:00",
            "2018-01-05 14:00:00",
            "2018-02-10 18:30:00",
            "2018-03-12 07:15:00",
            "2018-04-01 11:00:00",
            "2018-06-22 16:45:00",
            "2018-08-08 20:00:00",
        ],
        "order_delivered_customer_date" => &[
            Some("2016-10-20 16:00:00"),
            Some("2017-11-28 10:00:00"),
            Some("2017-12-01 12:00:00"),
            None,
            Some("2018-01-09 13:00:00"),
            Some("2018-02-20 18:30:00"),
            Some("2018-03-11 07:15:00"),
            Some("2018-04-08 11:00:00"),
            Some("2018-06-30 16:45:00"),
            Some("2018-08-10 20:00:00"),
        ],
        "product_category_name_english" => &[
            "housewares", "housewares", "housewares", "bed_bath", "bed_bath",
            "toys", "toys", "garden", "garden", "perfumery",
        ],
        "price" => &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0],
        "freight_value" => &[
            Some(5.0), Some(6.0), Some(7.0), Some(8.0), Some(9.0),
            None, Some(10.0), Some(11.0), Some(12.0), Some(13.0),
        ],
        "product_weight_g" => &[
            Some(500_i64), Some(800), Some(1200), Some(300), None,
            Some(450), Some(700), Some(2000), Some(900), Some(150),
        ],
        "payment_type" => &[
            "credit_card", "credit_card", "credit_card", "credit_card", "credit_card",
            "credit_card", "credit_card", "debit_card", "voucher", "voucher",
        ],
        "customer_state" => &["SP", "SP", "RJ", "SP", "MG", "RJ", "SP", "MG", "SP", "BA"]
    )
    .unwrap()
}

pub fn orders() -> RecordTable {
    RecordTable::try_from_orders(orders_frame()).unwrap()
}

/// Write `df` as a delimited file inside `dir`.
pub fn write_delimited(dir: &Path, name: &str, df: &mut DataFrame, separator: u8) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file)
        .with_separator(separator)
        .finish(df)
        .unwrap();
    path
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
