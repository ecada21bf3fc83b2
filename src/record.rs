//! Dispute Record Model
//!
//! Canonical shape of one billing dispute, the column identities the
//! aggregators key on, and the immutable record set every aggregation reads.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::{Itertools, MinMaxResult};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Label used when a categorical value is null
pub const UNSPECIFIED_LABEL: &str = "(unspecified)";

/// Kind of values a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Temporal,
}

/// Identity of every column a dispute dataset can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    PoNumber,
    CustomerName,
    SiteName,
    Item,
    DiscrepancyType,
    DiscrepancyStatus,
    DiscrepancyValue,
    Gallons,
    ExpectedRate,
    BilledRate,
    DifferencePerUnit,
    DisputedAt,
    OverriddenAt,
    ArchivedAt,
    // Derived from disputedAt during cleaning
    DisputedDate,
    DisputedMonth,
    DisputedYear,
}

impl Column {
    pub const ALL: [Column; 17] = [
        Column::PoNumber,
        Column::CustomerName,
        Column::SiteName,
        Column::Item,
        Column::DiscrepancyType,
        Column::DiscrepancyStatus,
        Column::DiscrepancyValue,
        Column::Gallons,
        Column::ExpectedRate,
        Column::BilledRate,
        Column::DifferencePerUnit,
        Column::DisputedAt,
        Column::OverriddenAt,
        Column::ArchivedAt,
        Column::DisputedDate,
        Column::DisputedMonth,
        Column::DisputedYear,
    ];

    /// Name of the column in the source table
    pub fn name(self) -> &'static str {
        match self {
            Column::PoNumber => "po_number",
            Column::CustomerName => "customerName",
            Column::SiteName => "siteName",
            Column::Item => "item",
            Column::DiscrepancyType => "discrepancy_type",
            Column::DiscrepancyStatus => "discrepancy_status",
            Column::DiscrepancyValue => "discrepancy_value",
            Column::Gallons => "gallons",
            Column::ExpectedRate => "expected_rate",
            Column::BilledRate => "billed_rate",
            Column::DifferencePerUnit => "difference_per_unit",
            Column::DisputedAt => "disputedAt",
            Column::OverriddenAt => "overriddenAt",
            Column::ArchivedAt => "archivedAt",
            Column::DisputedDate => "disputed_date",
            Column::DisputedMonth => "disputed_month",
            Column::DisputedYear => "disputed_year",
        }
    }

    /// Resolve a source column name (exact match)
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::PoNumber
            | Column::CustomerName
            | Column::SiteName
            | Column::Item
            | Column::DiscrepancyType
            | Column::DiscrepancyStatus
            | Column::DisputedMonth
            | Column::DisputedYear => ColumnKind::Categorical,
            Column::DiscrepancyValue
            | Column::Gallons
            | Column::ExpectedRate
            | Column::BilledRate
            | Column::DifferencePerUnit => ColumnKind::Numeric,
            Column::DisputedAt
            | Column::OverriddenAt
            | Column::ArchivedAt
            | Column::DisputedDate => ColumnKind::Temporal,
        }
    }

    /// Columns computed during cleaning rather than read from the source
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            Column::DisputedDate | Column::DisputedMonth | Column::DisputedYear
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side of the sign convention a discrepancy value falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Savings,
    Underbilled,
    Neutral,
}

impl Sign {
    pub fn of(value: f64) -> Sign {
        if value > 0.0 {
            Sign::Savings
        } else if value < 0.0 {
            Sign::Underbilled
        } else {
            Sign::Neutral
        }
    }
}

/// Calendar month bucket (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One cleaned dispute row
///
/// Numeric fields are always finite; missing or unparseable source values
/// are stored as 0. Timestamps are `None` when missing or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisputeRecord {
    pub po_number: Option<String>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "siteName")]
    pub site_name: Option<String>,
    pub item: Option<String>,
    pub discrepancy_type: Option<String>,
    pub discrepancy_status: Option<String>,
    pub discrepancy_value: f64,
    pub gallons: f64,
    pub expected_rate: f64,
    pub billed_rate: f64,
    pub difference_per_unit: f64,
    #[serde(rename = "disputedAt")]
    pub disputed_at: Option<NaiveDateTime>,
    #[serde(rename = "overriddenAt")]
    pub overridden_at: Option<NaiveDateTime>,
    #[serde(rename = "archivedAt")]
    pub archived_at: Option<NaiveDateTime>,
    pub disputed_date: Option<NaiveDate>,
    pub disputed_month: Option<YearMonth>,
    pub disputed_year: Option<i32>,
}

impl DisputeRecord {
    /// Record with only a discrepancy value set
    pub fn with_value(value: f64) -> Self {
        Self {
            discrepancy_value: value,
            ..Default::default()
        }
    }

    /// Set `disputedAt` and recompute the derived date fields
    pub fn with_disputed_at(mut self, disputed_at: Option<NaiveDateTime>) -> Self {
        self.set_disputed_at(disputed_at);
        self
    }

    pub fn set_disputed_at(&mut self, disputed_at: Option<NaiveDateTime>) {
        let date = disputed_at.map(|ts| ts.date());
        self.disputed_at = disputed_at;
        self.disputed_date = date;
        self.disputed_month = date.map(YearMonth::of);
        self.disputed_year = date.map(|d| d.year());
    }

    pub fn sign(&self) -> Sign {
        Sign::of(self.discrepancy_value)
    }

    /// Categorical value of a column, `None` for nulls and non-categorical columns
    pub fn category(&self, column: Column) -> Option<Cow<'_, str>> {
        fn borrowed(v: &Option<String>) -> Option<Cow<'_, str>> {
            v.as_deref().map(Cow::Borrowed)
        }

        match column {
            Column::PoNumber => borrowed(&self.po_number),
            Column::CustomerName => borrowed(&self.customer_name),
            Column::SiteName => borrowed(&self.site_name),
            Column::Item => borrowed(&self.item),
            Column::DiscrepancyType => borrowed(&self.discrepancy_type),
            Column::DiscrepancyStatus => borrowed(&self.discrepancy_status),
            Column::DisputedMonth => self.disputed_month.map(|m| Cow::Owned(m.to_string())),
            Column::DisputedYear => self.disputed_year.map(|y| Cow::Owned(y.to_string())),
            _ => None,
        }
    }

    /// Numeric value of a column, `None` for non-numeric columns
    pub fn numeric(&self, column: Column) -> Option<f64> {
        match column {
            Column::DiscrepancyValue => Some(self.discrepancy_value),
            Column::Gallons => Some(self.gallons),
            Column::ExpectedRate => Some(self.expected_rate),
            Column::BilledRate => Some(self.billed_rate),
            Column::DifferencePerUnit => Some(self.difference_per_unit),
            _ => None,
        }
    }

    /// Timestamp of a temporal column; `disputed_date` reads as midnight
    pub fn timestamp(&self, column: Column) -> Option<NaiveDateTime> {
        match column {
            Column::DisputedAt => self.disputed_at,
            Column::OverriddenAt => self.overridden_at,
            Column::ArchivedAt => self.archived_at,
            Column::DisputedDate => self.disputed_date.map(|d| d.and_time(NaiveTime::MIN)),
            _ => None,
        }
    }
}

/// Immutable set of cleaned records plus the columns the source carried
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisputeSet {
    records: Vec<DisputeRecord>,
    columns: BTreeSet<Column>,
}

impl DisputeSet {
    /// Build a set from records and the source columns that were present.
    /// Derived date columns follow the presence of `disputedAt`.
    pub fn new(records: Vec<DisputeRecord>, columns: impl IntoIterator<Item = Column>) -> Self {
        let mut columns: BTreeSet<Column> = columns
            .into_iter()
            .filter(|c| !c.is_derived())
            .collect();
        if columns.contains(&Column::DisputedAt) {
            columns.extend([Column::DisputedDate, Column::DisputedMonth, Column::DisputedYear]);
        }
        Self { records, columns }
    }

    /// Set whose source carried every known column
    pub fn with_all_columns(records: Vec<DisputeRecord>) -> Self {
        Self::new(records, Column::ALL)
    }

    /// New set over `records` with the same column presence as `self`
    pub fn derive(&self, records: Vec<DisputeRecord>) -> Self {
        Self {
            records,
            columns: self.columns.clone(),
        }
    }

    pub fn records(&self) -> &[DisputeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DisputeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    /// Resolve a requested column name against this set.
    ///
    /// Returns `None` when the name is unknown, the column is of another
    /// kind, or the source did not carry it.
    pub fn resolve(&self, name: &str, kind: ColumnKind) -> Option<Column> {
        Column::from_name(name).filter(|c| c.kind() == kind && self.has_column(*c))
    }

    /// Distinct non-null values of a categorical column, sorted
    pub fn options(&self, column: Column) -> Vec<String> {
        if !self.has_column(column) {
            return Vec::new();
        }
        self.records
            .iter()
            .filter_map(|r| r.category(column))
            .map(Cow::into_owned)
            .unique()
            .sorted()
            .collect()
    }

    /// Earliest and latest `disputed_date`
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.records.iter().filter_map(|r| r.disputed_date).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(d) => Some((d, d)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }
}

impl<'a> IntoIterator for &'a DisputeSet {
    type Item = &'a DisputeRecord;
    type IntoIter = std::slice::Iter<'a, DisputeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
