//! Dispute Filters
//!
//! Sidebar selections of the dashboard. A filter never mutates its input; it
//! produces a new record set with the same column presence.

use crate::record::{Column, DisputeRecord, DisputeSet};
use chrono::NaiveDate;

/// Optional criteria; `None` means "All"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisputeFilter {
    pub status: Option<String>,
    pub discrepancy_type: Option<String>,
    pub customer: Option<String>,
    /// Inclusive range on `disputed_date`
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl DisputeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_discrepancy_type(mut self, discrepancy_type: impl Into<String>) -> Self {
        self.discrepancy_type = Some(discrepancy_type.into());
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the filter. Criteria on columns the source lacks are skipped.
    pub fn apply(&self, records: &DisputeSet) -> DisputeSet {
        if self.is_empty() {
            return records.clone();
        }

        let criteria: Vec<(Column, &str)> = [
            (Column::DiscrepancyStatus, self.status.as_deref()),
            (Column::DiscrepancyType, self.discrepancy_type.as_deref()),
            (Column::CustomerName, self.customer.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, wanted)| wanted.map(|w| (column, w)))
        .filter(|(column, _)| records.has_column(*column))
        .collect();
        let date_range = self
            .date_range
            .filter(|_| records.has_column(Column::DisputedDate));

        let matches = |record: &DisputeRecord| {
            let categories_match = criteria
                .iter()
                .all(|(column, wanted)| record.category(*column).as_deref() == Some(*wanted));
            let date_matches = match date_range {
                Some((from, to)) => record.disputed_date.is_some_and(|d| d >= from && d <= to),
                None => true,
            };
            categories_match && date_matches
        };

        let kept: Vec<DisputeRecord> = records.iter().filter(|&r| matches(r)).cloned().collect();
        tracing::debug!("Filter kept {} of {} disputes", kept.len(), records.len());
        records.derive(kept)
    }
}
