//! Time Aggregation
//!
//! Buckets records by a temporal column into calendar-complete day, week or
//! month intervals. Records with a null timestamp are left out of every
//! bucket.

use crate::aggregation::{
    count_values, float_values, measure_frame, savings_sum, underbilled_sum, Aggregation,
};
use crate::error::{DashboardError, Result};
use crate::record::{Column, ColumnKind, DisputeSet};
use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::izip;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default temporal column for time views
pub const DEFAULT_DATE_FIELD: &str = "disputedAt";

/// Calendar bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Midnight to midnight
    Day,
    /// Monday 00:00 to the following Monday (ISO week)
    Week,
    /// First of the month to the first of the next
    Month,
}

impl Granularity {
    /// Start of the bucket containing `date`
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date - Duration::days(i64::from(date.day0())),
        }
    }

    /// Start of the bucket after the one starting at `start`
    pub fn next_start(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => start.succ_opt(),
            Granularity::Week => start.checked_add_days(Days::new(7)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
        }
    }
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "D" | "d" | "day" | "daily" => Ok(Granularity::Day),
            "W" | "w" | "week" | "weekly" => Ok(Granularity::Week),
            "M" | "m" | "month" | "monthly" => Ok(Granularity::Month),
            other => Err(DashboardError::InvalidArgument(format!(
                "Unknown granularity '{}', expected day, week or month",
                other
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        })
    }
}

/// One calendar bucket of the time view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub bucket_start: NaiveDateTime,
    /// Signed sum of discrepancy values
    pub total_discrepancy: f64,
    pub dispute_count: usize,
    pub total_gallons: f64,
    /// Sum of the positive discrepancy values in the bucket, the per-sign
    /// split of the daily savings/underbilled chart. Not derived from the
    /// sign of `total_discrepancy`, so a bucket can carry both.
    pub savings: f64,
    /// Magnitude of the sum of the negative discrepancy values in the bucket
    pub underbilled: f64,
}

impl TimeBucket {
    fn empty(start: NaiveDate) -> Self {
        Self {
            bucket_start: start.and_time(NaiveTime::MIN),
            total_discrepancy: 0.0,
            dispute_count: 0,
            total_gallons: 0.0,
            savings: 0.0,
            underbilled: 0.0,
        }
    }
}

const BUCKET: &str = "bucket_start";

/// Aggregate records into consecutive calendar buckets, oldest first.
///
/// Every bucket between the first and last observed timestamp is emitted,
/// including buckets with no records.
pub fn by_time(
    records: &DisputeSet,
    date_field: &str,
    granularity: Granularity,
) -> Result<Aggregation<TimeBucket>> {
    let Some(column) = records.resolve(date_field, ColumnKind::Temporal) else {
        return Ok(Aggregation::missing(date_field));
    };

    // Bucket keys as days since the common era; null timestamps stay null
    let keys: Vec<Option<i32>> = records
        .iter()
        .map(|r| {
            r.timestamp(column)
                .map(|ts| granularity.bucket_start(ts.date()).num_days_from_ce())
        })
        .collect();
    let excluded = keys.iter().filter(|k| k.is_none()).count();
    if excluded > 0 {
        tracing::debug!("{} records without {} excluded from time buckets", excluded, column);
    }
    if excluded == keys.len() {
        return Ok(Aggregation::Rows(Vec::new()));
    }

    let mut frame = measure_frame(records)?;
    frame.with_column(Series::new(BUCKET, keys))?;
    let groups = frame
        .lazy()
        .filter(col(BUCKET).is_not_null())
        .group_by([col(BUCKET)])
        .agg([
            col(Column::DiscrepancyValue.name()).sum().alias("total_discrepancy"),
            len().alias("dispute_count"),
            col(Column::Gallons.name()).sum().alias("total_gallons"),
            savings_sum().alias("savings"),
            underbilled_sum().alias("underbilled"),
        ])
        .collect()?;

    let starts: Vec<Option<NaiveDate>> = groups
        .column(BUCKET)?
        .i32()?
        .into_iter()
        .map(|day| day.and_then(NaiveDate::from_num_days_from_ce_opt))
        .collect();
    let mut buckets: BTreeMap<NaiveDate, TimeBucket> = izip!(
        starts,
        float_values(&groups, "total_discrepancy")?,
        count_values(&groups, "dispute_count")?,
        float_values(&groups, "total_gallons")?,
        float_values(&groups, "savings")?,
        float_values(&groups, "underbilled")?
    )
    .filter_map(|(start, total, count, gallons, savings, underbilled)| {
        let start = start?;
        Some((
            start,
            TimeBucket {
                bucket_start: start.and_time(NaiveTime::MIN),
                total_discrepancy: total,
                dispute_count: count,
                total_gallons: gallons,
                savings,
                underbilled,
            },
        ))
    })
    .collect();

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Aggregation::Rows(Vec::new()));
    };

    let mut rows = Vec::with_capacity(buckets.len());
    let mut cursor = Some(first);
    while let Some(start) = cursor.filter(|s| *s <= last) {
        rows.push(buckets.remove(&start).unwrap_or_else(|| TimeBucket::empty(start)));
        cursor = granularity.next_start(start);
    }

    Ok(Aggregation::Rows(rows))
}
