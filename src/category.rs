//! Category Aggregation
//!
//! Groups records by a categorical column and computes per-group statistics.
//! Null category values form their own group so group totals always
//! reconcile with the summary metrics.

use crate::aggregation::{count_values, float_values, measure_frame, round2, Aggregation};
use crate::error::Result;
use crate::record::{Column, ColumnKind, DisputeSet, Sign, UNSPECIFIED_LABEL};
use itertools::izip;
use polars::prelude::*;
use serde::Serialize;
use std::borrow::Cow;

/// Per-category statistics row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    /// `None` for the group of records with a null category
    pub category: Option<String>,
    pub total_discrepancy: f64,
    pub avg_discrepancy: f64,
    pub count: usize,
    pub total_gallons: f64,
    pub avg_gallons: f64,
    pub avg_expected_rate: f64,
    pub avg_billed_rate: f64,
}

impl CategoryRow {
    pub fn label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNSPECIFIED_LABEL)
    }
}

/// Net impact of one category, as plotted in bar and pie charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryImpact {
    pub category: Option<String>,
    pub net_discrepancy: f64,
    pub sign: Sign,
    /// Fraction of the absolute net total across all categories
    pub share: f64,
}

impl CategoryImpact {
    pub fn label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNSPECIFIED_LABEL)
    }
}

/// Group the measure frame by the category column, one row per distinct key
fn grouped(records: &DisputeSet, column: Column) -> Result<DataFrame> {
    let keys: Vec<Option<String>> = records
        .iter()
        .map(|r| r.category(column).map(Cow::into_owned))
        .collect();
    let mut frame = measure_frame(records)?;
    frame.with_column(Series::new(column.name(), keys))?;

    let value = Column::DiscrepancyValue.name();
    let gallons = Column::Gallons.name();
    let groups = frame
        .lazy()
        .group_by([col(column.name())])
        .agg([
            col(value).sum().alias("total_discrepancy"),
            col(value).mean().alias("avg_discrepancy"),
            len().alias("count"),
            col(gallons).sum().alias("total_gallons"),
            col(gallons).mean().alias("avg_gallons"),
            col(Column::ExpectedRate.name()).mean().alias("avg_expected_rate"),
            col(Column::BilledRate.name()).mean().alias("avg_billed_rate"),
        ])
        .collect()?;
    Ok(groups)
}

fn group_keys(groups: &DataFrame, column: Column) -> Result<Vec<Option<String>>> {
    Ok(groups
        .column(column.name())?
        .str()?
        .into_iter()
        .map(|key| key.map(str::to_string))
        .collect())
}

/// Aggregate metrics per category, sorted by total discrepancy descending.
///
/// Equal totals are ordered by category, the null group first.
pub fn by_category(records: &DisputeSet, category_field: &str) -> Result<Aggregation<CategoryRow>> {
    let Some(column) = records.resolve(category_field, ColumnKind::Categorical) else {
        return Ok(Aggregation::missing(category_field));
    };
    if records.is_empty() {
        return Ok(Aggregation::Rows(Vec::new()));
    }

    let groups = grouped(records, column)?;
    let mut rows: Vec<CategoryRow> = izip!(
        group_keys(&groups, column)?,
        float_values(&groups, "total_discrepancy")?,
        float_values(&groups, "avg_discrepancy")?,
        count_values(&groups, "count")?,
        float_values(&groups, "total_gallons")?,
        float_values(&groups, "avg_gallons")?,
        float_values(&groups, "avg_expected_rate")?,
        float_values(&groups, "avg_billed_rate")?
    )
    .map(|(category, total, avg, count, gallons, avg_gallons, expected, billed)| CategoryRow {
        category,
        total_discrepancy: round2(total),
        avg_discrepancy: round2(avg),
        count,
        total_gallons: round2(gallons),
        avg_gallons: round2(avg_gallons),
        avg_expected_rate: round2(expected),
        avg_billed_rate: round2(billed),
    })
    .collect();

    rows.sort_by(|a, b| {
        b.total_discrepancy
            .total_cmp(&a.total_discrepancy)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(Aggregation::Rows(rows))
}

/// Net discrepancy of the `top_n` most impactful categories.
///
/// Categories are ranked by absolute net value, then the kept ones are
/// ordered by net value descending so savings come before underbilled.
pub fn category_impact(
    records: &DisputeSet,
    category_field: &str,
    top_n: usize,
) -> Result<Aggregation<CategoryImpact>> {
    let Some(column) = records.resolve(category_field, ColumnKind::Categorical) else {
        return Ok(Aggregation::missing(category_field));
    };
    if records.is_empty() {
        return Ok(Aggregation::Rows(Vec::new()));
    }

    let groups = grouped(records, column)?;
    let nets = float_values(&groups, "total_discrepancy")?;
    let absolute_total: f64 = nets.iter().map(|net| net.abs()).sum();

    let mut impacts: Vec<CategoryImpact> = group_keys(&groups, column)?
        .into_iter()
        .zip(nets)
        .map(|(category, net)| CategoryImpact {
            category,
            net_discrepancy: net,
            sign: Sign::of(net),
            share: if absolute_total > 0.0 {
                net.abs() / absolute_total
            } else {
                0.0
            },
        })
        .collect();

    impacts.sort_by(|a, b| {
        b.net_discrepancy
            .abs()
            .total_cmp(&a.net_discrepancy.abs())
            .then_with(|| a.category.cmp(&b.category))
    });
    impacts.truncate(top_n);
    impacts.sort_by(|a, b| b.net_discrepancy.total_cmp(&a.net_discrepancy));
    Ok(Aggregation::Rows(impacts))
}
