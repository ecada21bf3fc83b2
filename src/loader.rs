//! Dispute Loader
//!
//! Reads the delimited disputes table and cleans it into a [`DisputeSet`]:
//! numeric cells coerce to 0, timestamps coerce to null, and the derived
//! date fields are computed once per record.

use crate::error::{DashboardError, Result};
use crate::record::{Column, DisputeRecord, DisputeSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Default location of the disputes export
pub const DEFAULT_DATA_FILE: &str = "data/disputes-all-data.csv";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a numeric cell; empty, invalid and non-finite values become 0
pub fn parse_numeric(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse a timestamp cell, `None` when it cannot be understood.
///
/// Offset-aware values keep their local wall-clock time, so the calendar
/// date is the one written in the source.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_local());
    }
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Some(ts);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_category(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Column positions of the known source columns in one file
struct HeaderIndex {
    positions: HashMap<Column, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| {
                // Derived columns are always recomputed from disputedAt
                Column::from_name(h.trim())
                    .filter(|c| !c.is_derived())
                    .map(|c| (c, idx))
            })
            .collect();
        Self { positions }
    }

    fn cell<'r>(&self, row: &'r StringRecord, column: Column) -> &'r str {
        self.positions
            .get(&column)
            .and_then(|&idx| row.get(idx))
            .unwrap_or("")
    }

    fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.positions.keys().copied()
    }
}

#[derive(Default)]
struct TimestampStats {
    unparseable: usize,
}

impl TimestampStats {
    fn parse(&mut self, raw: &str) -> Option<NaiveDateTime> {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            self.unparseable += 1;
        }
        parsed
    }
}

fn clean_row(index: &HeaderIndex, row: &StringRecord, stats: &mut TimestampStats) -> DisputeRecord {
    let text = |c| parse_category(index.cell(row, c));
    let number = |c| parse_numeric(index.cell(row, c));

    let record = DisputeRecord {
        po_number: text(Column::PoNumber),
        customer_name: text(Column::CustomerName),
        site_name: text(Column::SiteName),
        item: text(Column::Item),
        discrepancy_type: text(Column::DiscrepancyType),
        discrepancy_status: text(Column::DiscrepancyStatus),
        discrepancy_value: number(Column::DiscrepancyValue),
        gallons: number(Column::Gallons),
        expected_rate: number(Column::ExpectedRate),
        billed_rate: number(Column::BilledRate),
        difference_per_unit: number(Column::DifferencePerUnit),
        overridden_at: stats.parse(index.cell(row, Column::OverriddenAt)),
        archived_at: stats.parse(index.cell(row, Column::ArchivedAt)),
        ..Default::default()
    };
    record.with_disputed_at(stats.parse(index.cell(row, Column::DisputedAt)))
}

/// Load and clean disputes from any CSV reader
pub fn load_disputes_from_reader<R: Read>(reader: R) -> Result<DisputeSet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let index = HeaderIndex::new(rdr.headers()?);
    let mut stats = TimestampStats::default();
    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(clean_row(&index, &row, &mut stats));
    }

    if stats.unparseable > 0 {
        warn!("{} timestamps could not be parsed and were set to null", stats.unparseable);
    }
    let set = DisputeSet::new(records, index.columns());
    info!("Loaded {} disputes ({} columns recognized)", set.len(), set.columns().count());
    Ok(set)
}

/// Load and clean the disputes table at `path`
pub fn load_disputes(path: impl AsRef<Path>) -> Result<DisputeSet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DashboardError::SourceNotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    load_disputes_from_reader(file)
}

/// Write records as CSV using the source column names
pub fn write_disputes(path: impl AsRef<Path>, records: &[DisputeRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path.as_ref())?;
    if records.is_empty() {
        // serialize() only emits a header alongside the first row
        wtr.write_record(Column::ALL.iter().map(|c| c.name()))?;
    }
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
