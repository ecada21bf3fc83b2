//! DataFrame export
//!
//! Converts aggregation results into polars DataFrames for the presentation
//! layer (tables, charts, CSV download).

use crate::aggregation::Aggregation;
use crate::category::{CategoryImpact, CategoryRow};
use crate::error::Result;
use crate::metrics::SummaryMetrics;
use crate::record::DisputeRecord;
use crate::time::TimeBucket;
use polars::prelude::*;

/// Columns shown for individual disputes in top-N tables
pub const DISPUTE_DISPLAY_COLUMNS: [&str; 8] = [
    "po_number",
    "customerName",
    "siteName",
    "item",
    "discrepancy_value",
    "gallons",
    "disputedAt",
    "discrepancy_type",
];

pub trait IntoFrame {
    fn to_frame(&self) -> Result<DataFrame>;
}

impl IntoFrame for SummaryMetrics {
    fn to_frame(&self) -> Result<DataFrame> {
        let (names, values): (Vec<&str>, Vec<f64>) = self.entries().into_iter().unzip();
        Ok(df!(
            "metric" => names,
            "value" => values
        )?)
    }
}

impl IntoFrame for [CategoryRow] {
    fn to_frame(&self) -> Result<DataFrame> {
        Ok(df!(
            "category" => self.iter().map(|r| r.label().to_string()).collect::<Vec<_>>(),
            "total_discrepancy" => self.iter().map(|r| r.total_discrepancy).collect::<Vec<_>>(),
            "avg_discrepancy" => self.iter().map(|r| r.avg_discrepancy).collect::<Vec<_>>(),
            "count" => self.iter().map(|r| r.count as u64).collect::<Vec<_>>(),
            "total_gallons" => self.iter().map(|r| r.total_gallons).collect::<Vec<_>>(),
            "avg_gallons" => self.iter().map(|r| r.avg_gallons).collect::<Vec<_>>(),
            "avg_expected_rate" => self.iter().map(|r| r.avg_expected_rate).collect::<Vec<_>>(),
            "avg_billed_rate" => self.iter().map(|r| r.avg_billed_rate).collect::<Vec<_>>()
        )?)
    }
}

impl IntoFrame for [CategoryImpact] {
    fn to_frame(&self) -> Result<DataFrame> {
        Ok(df!(
            "category" => self.iter().map(|r| r.label().to_string()).collect::<Vec<_>>(),
            "net_discrepancy" => self.iter().map(|r| r.net_discrepancy).collect::<Vec<_>>(),
            "sign" => self.iter().map(|r| format!("{:?}", r.sign)).collect::<Vec<_>>(),
            "share" => self.iter().map(|r| r.share).collect::<Vec<_>>()
        )?)
    }
}

impl IntoFrame for [TimeBucket] {
    fn to_frame(&self) -> Result<DataFrame> {
        Ok(df!(
            "bucket_start" => self.iter().map(|b| b.bucket_start).collect::<Vec<_>>(),
            "total_discrepancy" => self.iter().map(|b| b.total_discrepancy).collect::<Vec<_>>(),
            "dispute_count" => self.iter().map(|b| b.dispute_count as u64).collect::<Vec<_>>(),
            "total_gallons" => self.iter().map(|b| b.total_gallons).collect::<Vec<_>>(),
            "savings" => self.iter().map(|b| b.savings).collect::<Vec<_>>(),
            "underbilled" => self.iter().map(|b| b.underbilled).collect::<Vec<_>>()
        )?)
    }
}

impl IntoFrame for [DisputeRecord] {
    fn to_frame(&self) -> Result<DataFrame> {
        Ok(df!(
            "po_number" => self.iter().map(|r| r.po_number.clone()).collect::<Vec<_>>(),
            "customerName" => self.iter().map(|r| r.customer_name.clone()).collect::<Vec<_>>(),
            "siteName" => self.iter().map(|r| r.site_name.clone()).collect::<Vec<_>>(),
            "item" => self.iter().map(|r| r.item.clone()).collect::<Vec<_>>(),
            "discrepancy_value" => self.iter().map(|r| r.discrepancy_value).collect::<Vec<_>>(),
            "gallons" => self.iter().map(|r| r.gallons).collect::<Vec<_>>(),
            "disputedAt" => self.iter().map(|r| r.disputed_at).collect::<Vec<_>>(),
            "discrepancy_type" => self
                .iter()
                .map(|r| r.discrepancy_type.clone())
                .collect::<Vec<_>>()
        )?)
    }
}

impl<T> IntoFrame for Aggregation<T>
where
    [T]: IntoFrame,
{
    fn to_frame(&self) -> Result<DataFrame> {
        match self {
            Aggregation::Rows(rows) => rows.as_slice().to_frame(),
            Aggregation::MissingColumn { .. } => Ok(DataFrame::empty()),
        }
    }
}
