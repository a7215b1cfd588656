//! Assembles the labelled data bundle behind each display tab.
//!
//! Every bundle is computed from the table passed in; nothing is cached
//! between calls. Time attributes are always re-derived from the raw
//! timestamps, replacing any columns of the same name.

use crate::aggregate::{
    distribution, filter_by_keys, group_and_measure, n_unique, pivot, round_view, sample_values,
    top_n, unique_values, AggregateView, FillPolicy, Measure, Order, PivotView,
};
use crate::error::{Error, Result, TimestampParseError};
use crate::statistics::{
    correlation_matrix, covariance_matrix, five_number_summary, pairwise_covariance,
    scatter_points, FiveNumberSummary, Matrix, ScatterPoints,
};
use crate::table::{columns, RecordTable};
use crate::time::{
    derive_all, derive_delivery_time, derive_weekday, derive_year, NegativeDeliveryPolicy,
};
use crate::ViewName;
use serde::Serialize;
use tracing::debug;

/// Tunables for bundle assembly
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub top_n: usize,
    pub price_decimals: u32,
    pub display_decimals: u32,
    pub sample_size: usize,
    pub sample_seed: u64,
    pub negative_delivery: NegativeDeliveryPolicy,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            top_n: 10,
            price_decimals: 2,
            display_decimals: 2,
            sample_size: 15,
            sample_seed: 42,
            negative_delivery: NegativeDeliveryPolicy::Retain,
        }
    }
}

/// A single number with its rounded display form. An undefined value
/// displays as "undefined".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub value: Option<f64>,
    pub display: String,
}

impl Scalar {
    pub fn new(value: Option<f64>, decimals: u32) -> Self {
        let display = match value {
            Some(v) => format!("{:.*}", decimals as usize, v),
            None => "undefined".to_string(),
        };
        Self { value, display }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ViewItem {
    Series(AggregateView),
    Pivot(PivotView),
    Matrix(Matrix),
    Scalar(Scalar),
    Values(Vec<String>),
    Summary(FiveNumberSummary),
    Scatter(ScatterPoints),
    /// Not enough data to compute the item
    Undefined {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleItem {
    pub label: &'static str,
    pub item: ViewItem,
}

/// Ordered, labelled items for one tab
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    pub view: &'static str,
    pub title: &'static str,
    pub items: Vec<BundleItem>,
    pub warnings: Vec<TimestampParseError>,
}

impl Bundle {
    fn new(view: ViewName) -> Self {
        Self {
            view: view.as_str(),
            title: view.title(),
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push(&mut self, label: &'static str, item: ViewItem) {
        self.items.push(BundleItem { label, item });
    }

    pub fn get(&self, label: &str) -> Option<&ViewItem> {
        self.items
            .iter()
            .find(|i| i.label == label)
            .map(|i| &i.item)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.items.iter().map(|i| i.label).collect()
    }
}

/// Turns an insufficient-data failure into an undefined item. Every other
/// error still fails the bundle.
fn or_undefined<T>(result: Result<T>, item: impl FnOnce(T) -> ViewItem) -> Result<ViewItem> {
    match result {
        Ok(value) => Ok(item(value)),
        Err(Error::InsufficientData(e)) => {
            debug!(reason = %e, "item undefined");
            Ok(ViewItem::Undefined {
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

fn count_by(table: &RecordTable, column: &str, order: Order) -> Result<AggregateView> {
    group_and_measure(table, &[column], &Measure::Count, order)
}

fn summary_of(view: &AggregateView) -> Result<ViewItem> {
    let values: Vec<f64> = view.values().into_iter().flatten().collect();
    or_undefined(five_number_summary(&values), ViewItem::Summary)
}

/// Builds the bundle for `view`. Data-quality warnings found while
/// deriving time attributes are attached to the bundle.
pub fn assemble(table: &RecordTable, view: ViewName, settings: &ViewSettings) -> Result<Bundle> {
    debug!(view = view.as_str(), rows = table.height(), "assembling bundle");
    let mut bundle = Bundle::new(view);
    let source = match view {
        ViewName::EarlyEda => early_eda(table, &mut bundle)?,
        ViewName::TopProducts => top_products(table, settings, &mut bundle)?,
        ViewName::PaymentAnalysis => payment_analysis(table, settings, &mut bundle)?,
        ViewName::CustomerAnalysis => customer_analysis(table, settings, &mut bundle)?,
        ViewName::Correlation => correlation(table, &mut bundle)?,
        ViewName::Covariance => covariance(table, settings, &mut bundle)?,
        ViewName::QAndA => q_and_a(table, settings, &mut bundle)?,
    };
    bundle.warnings = source.warnings().to_vec();
    debug!(view = view.as_str(), items = bundle.items.len(), "bundle ready");
    Ok(bundle)
}

fn early_eda(table: &RecordTable, bundle: &mut Bundle) -> Result<RecordTable> {
    let table = derive_all(table)?;
    let order = Order::ByKeyAscending;
    bundle.push(
        "purchases_per_year",
        ViewItem::Series(count_by(&table, columns::YEAR, order)?),
    );
    bundle.push(
        "purchases_per_month",
        ViewItem::Series(count_by(&table, columns::MONTH, order)?),
    );
    bundle.push(
        "purchases_per_month_year",
        ViewItem::Series(count_by(&table, columns::MONTH_YEAR, order)?),
    );
    bundle.push(
        "purchases_per_weekday",
        ViewItem::Series(count_by(&table, columns::WEEKDAY, order)?),
    );
    Ok(table)
}

fn top_products(
    table: &RecordTable,
    settings: &ViewSettings,
    bundle: &mut Bundle,
) -> Result<RecordTable> {
    let counts = count_by(table, columns::CATEGORY, Order::ByMeasureDescending)?;
    let top = top_n(&counts, settings.top_n);

    let average = round_view(
        &group_and_measure(
            table,
            &[columns::CATEGORY],
            &Measure::mean(columns::PRICE),
            Order::ByMeasureAscending,
        )?,
        settings.price_decimals,
    );

    let top_keys: Vec<_> = top
        .keys()
        .into_iter()
        .filter_map(|k| k.first().cloned())
        .collect();
    let top_table = filter_by_keys(table, columns::CATEGORY, &top_keys)?;
    let top_average = round_view(
        &group_and_measure(
            &top_table,
            &[columns::CATEGORY],
            &Measure::mean(columns::PRICE),
            Order::ByMeasureDescending,
        )?,
        settings.price_decimals,
    );

    let average_summary = summary_of(&average)?;
    let top_average_summary = summary_of(&top_average)?;

    bundle.push("top_categories", ViewItem::Series(top));
    bundle.push("average_price_per_category", ViewItem::Series(average));
    bundle.push("average_price_top_categories", ViewItem::Series(top_average));
    bundle.push("average_price_summary", average_summary);
    bundle.push("average_price_top_categories_summary", top_average_summary);
    Ok(table.clone())
}

fn payment_analysis(
    table: &RecordTable,
    settings: &ViewSettings,
    bundle: &mut Bundle,
) -> Result<RecordTable> {
    let table = derive_year(table)?;
    let sample = sample_values(
        &table,
        columns::PAYMENT_TYPE,
        settings.sample_size,
        settings.sample_seed,
    )?
    .into_iter()
    .map(Option::unwrap_or_default)
    .collect();
    let kinds = n_unique(&table, columns::PAYMENT_TYPE)?;
    let counts = count_by(&table, columns::PAYMENT_TYPE, Order::ByMeasureDescending)?;
    let share = distribution(&counts);

    bundle.push("payment_type_sample", ViewItem::Values(sample));
    bundle.push(
        "payment_type_count",
        ViewItem::Scalar(Scalar::new(Some(kinds as f64), 0)),
    );
    bundle.push(
        "payment_types",
        ViewItem::Values(unique_values(&table, columns::PAYMENT_TYPE)?),
    );
    bundle.push("payment_type_counts", ViewItem::Series(counts));
    bundle.push("payment_type_share", ViewItem::Series(share));
    bundle.push(
        "payment_types_per_year",
        ViewItem::Pivot(pivot(
            &table,
            columns::YEAR,
            columns::PAYMENT_TYPE,
            &Measure::Count,
            FillPolicy::Absent,
        )?),
    );
    Ok(table)
}

fn customer_analysis(
    table: &RecordTable,
    settings: &ViewSettings,
    bundle: &mut Bundle,
) -> Result<RecordTable> {
    let table = derive_delivery_time(table, settings.negative_delivery)?;

    bundle.push(
        "customers_per_state",
        ViewItem::Series(count_by(
            &table,
            columns::CUSTOMER_STATE,
            Order::ByMeasureDescending,
        )?),
    );
    bundle.push(
        "delivery_days_per_state",
        ViewItem::Series(group_and_measure(
            &table,
            &[columns::CUSTOMER_STATE],
            &Measure::mean(columns::DELIVERY_TIME),
            Order::ByKeyAscending,
        )?),
    );
    Ok(table)
}

fn correlation(table: &RecordTable, bundle: &mut Bundle) -> Result<RecordTable> {
    let loaded = table.without_derived()?;
    bundle.push(
        "correlation_matrix",
        or_undefined(correlation_matrix(&loaded), ViewItem::Matrix)?,
    );
    bundle.push(
        "price_vs_freight",
        ViewItem::Scatter(scatter_points(
            &loaded,
            columns::PRICE,
            columns::FREIGHT_VALUE,
        )?),
    );
    bundle.push(
        "weight_vs_freight",
        ViewItem::Scatter(scatter_points(
            &loaded,
            columns::PRODUCT_WEIGHT,
            columns::FREIGHT_VALUE,
        )?),
    );
    Ok(loaded)
}

fn covariance(
    table: &RecordTable,
    settings: &ViewSettings,
    bundle: &mut Bundle,
) -> Result<RecordTable> {
    let loaded = table.without_derived()?;
    let decimals = settings.display_decimals;
    bundle.push(
        "covariance_matrix",
        or_undefined(covariance_matrix(&loaded), ViewItem::Matrix)?,
    );
    let scalar = |value| ViewItem::Scalar(Scalar::new(value, decimals));
    bundle.push(
        "covariance_price_freight",
        or_undefined(
            pairwise_covariance(&loaded, columns::PRICE, columns::FREIGHT_VALUE),
            scalar,
        )?,
    );
    bundle.push(
        "covariance_weight_freight",
        or_undefined(
            pairwise_covariance(&loaded, columns::PRODUCT_WEIGHT, columns::FREIGHT_VALUE),
            scalar,
        )?,
    );
    Ok(loaded)
}

fn q_and_a(
    table: &RecordTable,
    settings: &ViewSettings,
    bundle: &mut Bundle,
) -> Result<RecordTable> {
    let table = derive_weekday(&derive_year(table)?)?;

    let categories = count_by(&table, columns::CATEGORY, Order::ByMeasureDescending)?;
    let payments = count_by(&table, columns::PAYMENT_TYPE, Order::ByMeasureDescending)?;
    let most = payments.entries.first().map(|e| e.key.to_string());
    let least = payments.entries.last().map(|e| e.key.to_string());

    bundle.push(
        "purchases_per_weekday",
        ViewItem::Series(count_by(
            &table,
            columns::WEEKDAY,
            Order::ByMeasureAscending,
        )?),
    );
    bundle.push(
        "top_categories",
        ViewItem::Series(top_n(&categories, settings.top_n)),
    );
    bundle.push(
        "payment_type_share",
        ViewItem::Series(distribution(&payments)),
    );
    bundle.push(
        "most_frequent_payment_type",
        ViewItem::Values(most.into_iter().collect()),
    );
    bundle.push(
        "least_frequent_payment_type",
        ViewItem::Values(least.into_iter().collect()),
    );
    bundle.push(
        "payment_types_per_year",
        ViewItem::Pivot(pivot(
            &table,
            columns::YEAR,
            columns::PAYMENT_TYPE,
            &Measure::Count,
            FillPolicy::Zero,
        )?),
    );
    Ok(table)
}
