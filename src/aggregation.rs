//! Aggregation results
//!
//! Every table-producing aggregator returns an [`Aggregation`]. A requested
//! column that the record set cannot serve yields the typed
//! [`Aggregation::MissingColumn`] variant instead of an error.
//!
//! Grouping runs on polars: a record set is turned into a measure frame, a
//! key column is attached, and the aggregators group and sum over it.

use crate::error::Result;
use crate::record::{Column, DisputeRecord, DisputeSet};
use polars::prelude::*;

/// Rows of a derived table, or the empty result for an unavailable column
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation<T> {
    Rows(Vec<T>),
    MissingColumn { requested: String },
}

impl<T> Aggregation<T> {
    pub(crate) fn missing(requested: &str) -> Self {
        tracing::debug!("Column '{}' unavailable, returning empty aggregation", requested);
        Aggregation::MissingColumn {
            requested: requested.to_string(),
        }
    }

    /// Rows of the table; empty for a missing column
    pub fn rows(&self) -> &[T] {
        match self {
            Aggregation::Rows(rows) => rows,
            Aggregation::MissingColumn { .. } => &[],
        }
    }

    pub fn into_rows(self) -> Vec<T> {
        match self {
            Aggregation::Rows(rows) => rows,
            Aggregation::MissingColumn { .. } => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn is_missing_column(&self) -> bool {
        matches!(self, Aggregation::MissingColumn { .. })
    }
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean with 0 for an empty input
pub(crate) fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// One row per record with the numeric measure columns
pub(crate) fn measure_frame(records: &DisputeSet) -> Result<DataFrame> {
    let values = |field: fn(&DisputeRecord) -> f64| records.iter().map(field).collect::<Vec<_>>();
    Ok(df!(
        Column::DiscrepancyValue.name() => values(|r| r.discrepancy_value),
        Column::Gallons.name() => values(|r| r.gallons),
        Column::ExpectedRate.name() => values(|r| r.expected_rate),
        Column::BilledRate.name() => values(|r| r.billed_rate)
    )?)
}

fn discrepancy() -> Expr {
    col(Column::DiscrepancyValue.name())
}

/// Sum of positive discrepancy values
pub(crate) fn savings_sum() -> Expr {
    when(discrepancy().gt(lit(0.0)))
        .then(discrepancy())
        .otherwise(lit(0.0))
        .sum()
}

/// Magnitude of the sum of negative discrepancy values
pub(crate) fn underbilled_sum() -> Expr {
    when(discrepancy().lt(lit(0.0)))
        .then(lit(0.0) - discrepancy())
        .otherwise(lit(0.0))
        .sum()
}

pub(crate) fn savings_count() -> Expr {
    discrepancy().gt(lit(0.0)).cast(DataType::UInt32).sum()
}

pub(crate) fn underbilled_count() -> Expr {
    discrepancy().lt(lit(0.0)).cast(DataType::UInt32).sum()
}

/// Values of a numeric result column as `f64`, nulls read as 0
pub(crate) fn float_values(frame: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

/// Values of a count result column
pub(crate) fn count_values(frame: &DataFrame, name: &str) -> Result<Vec<usize>> {
    let series = frame.column(name)?.cast(&DataType::UInt64)?;
    Ok(series
        .u64()?
        .into_iter()
        .map(|v| v.unwrap_or(0) as usize)
        .collect())
}
