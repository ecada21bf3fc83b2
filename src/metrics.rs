//! Summary Metrics
//!
//! Headline numbers of the dashboard, computed as a single polars selection
//! over a record set.

use crate::aggregation::{
    count_values, float_values, mean, measure_frame, savings_count, savings_sum, underbilled_count,
    underbilled_sum,
};
use crate::error::Result;
use crate::record::{Column, DisputeSet};
use polars::prelude::*;
use serde::Serialize;

/// Fixed mapping of named scalar metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SummaryMetrics {
    pub total_disputes: usize,
    /// Savings minus underbilled
    pub total_discrepancy_value: f64,
    pub total_gallons: f64,
    /// 0 for an empty record set
    pub avg_discrepancy_per_dispute: f64,
    /// 0 for an empty record set
    pub avg_gallons_per_dispute: f64,
    /// Total savings
    pub total_positive_discrepancy: f64,
    /// Total underbilled, as a non-negative magnitude
    pub total_negative_discrepancy: f64,
    pub disputes_with_positive_value: usize,
    pub disputes_with_negative_value: usize,
}

impl SummaryMetrics {
    /// Metrics as ordered `(name, value)` pairs
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total_disputes", self.total_disputes as f64),
            ("total_discrepancy_value", self.total_discrepancy_value),
            ("total_gallons", self.total_gallons),
            ("avg_discrepancy_per_dispute", self.avg_discrepancy_per_dispute),
            ("avg_gallons_per_dispute", self.avg_gallons_per_dispute),
            ("total_positive_discrepancy", self.total_positive_discrepancy),
            ("total_negative_discrepancy", self.total_negative_discrepancy),
            ("disputes_with_positive_value", self.disputes_with_positive_value as f64),
            ("disputes_with_negative_value", self.disputes_with_negative_value as f64),
        ]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// Compute summary metrics for a record set
pub fn summary_metrics(records: &DisputeSet) -> Result<SummaryMetrics> {
    if records.is_empty() {
        return Ok(SummaryMetrics::default());
    }

    let totals = measure_frame(records)?
        .lazy()
        .select([
            len().alias("total_disputes"),
            col(Column::DiscrepancyValue.name()).sum().alias("total_discrepancy_value"),
            col(Column::Gallons.name()).sum().alias("total_gallons"),
            savings_sum().alias("total_positive_discrepancy"),
            underbilled_sum().alias("total_negative_discrepancy"),
            savings_count().alias("disputes_with_positive_value"),
            underbilled_count().alias("disputes_with_negative_value"),
        ])
        .collect()?;

    let float = |name: &str| -> Result<f64> {
        Ok(float_values(&totals, name)?.first().copied().unwrap_or(0.0))
    };
    let count = |name: &str| -> Result<usize> {
        Ok(count_values(&totals, name)?.first().copied().unwrap_or(0))
    };

    let total_disputes = count("total_disputes")?;
    let total_discrepancy_value = float("total_discrepancy_value")?;
    let total_gallons = float("total_gallons")?;
    Ok(SummaryMetrics {
        total_disputes,
        total_discrepancy_value,
        total_gallons,
        avg_discrepancy_per_dispute: mean(total_discrepancy_value, total_disputes),
        avg_gallons_per_dispute: mean(total_gallons, total_disputes),
        total_positive_discrepancy: float("total_positive_discrepancy")?,
        total_negative_discrepancy: float("total_negative_discrepancy")?,
        disputes_with_positive_value: count("disputes_with_positive_value")?,
        disputes_with_negative_value: count("disputes_with_negative_value")?,
    })
}
