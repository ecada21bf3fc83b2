//! Top-N Selection
//!
//! Picks the largest or smallest records by a numeric column. Ties keep the
//! original record order.

use crate::record::{Column, ColumnKind, DisputeRecord, DisputeSet, Sign};
use std::cmp::Ordering;

/// Sort column used when the requested one is unavailable
pub const DEFAULT_SORT_FIELD: &str = "discrepancy_value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Descending: biggest savings first
    Largest,
    /// Ascending: most underbilled first
    Smallest,
}

impl Direction {
    fn compare(self, a: f64, b: f64) -> Ordering {
        match self {
            Direction::Largest => b.total_cmp(&a),
            Direction::Smallest => a.total_cmp(&b),
        }
    }
}

fn sort_column(records: &DisputeSet, sort_field: &str) -> Column {
    records
        .resolve(sort_field, ColumnKind::Numeric)
        .unwrap_or_else(|| {
            if sort_field != DEFAULT_SORT_FIELD {
                tracing::debug!(
                    "Sort field '{}' unavailable, falling back to {}",
                    sort_field,
                    DEFAULT_SORT_FIELD
                );
            }
            Column::DiscrepancyValue
        })
}

fn select<F>(
    records: &DisputeSet,
    n: usize,
    column: Column,
    direction: Direction,
    keep: F,
) -> Vec<DisputeRecord>
where
    F: Fn(&DisputeRecord) -> bool,
{
    let key = |r: &DisputeRecord| r.numeric(column).unwrap_or_default();

    let mut ranked: Vec<&DisputeRecord> = records.iter().filter(|&r| keep(r)).collect();
    // sort_by is stable, so ties stay in input order
    ranked.sort_by(|a, b| direction.compare(key(*a), key(*b)));
    ranked.into_iter().take(n).cloned().collect()
}

/// Up to `n` records ranked by `sort_field`.
///
/// An unknown, non-numeric or absent sort field falls back to
/// `discrepancy_value`.
pub fn top_n(
    records: &DisputeSet,
    n: usize,
    sort_field: &str,
    direction: Direction,
) -> Vec<DisputeRecord> {
    let column = sort_column(records, sort_field);
    select(records, n, column, direction, |_| true)
}

/// Largest savings (positive discrepancy values only)
pub fn top_savings(records: &DisputeSet, n: usize) -> Vec<DisputeRecord> {
    select(records, n, Column::DiscrepancyValue, Direction::Largest, |r| {
        r.sign() == Sign::Savings
    })
}

/// Most underbilled (negative discrepancy values only), most negative first
pub fn top_underbilled(records: &DisputeSet, n: usize) -> Vec<DisputeRecord> {
    select(records, n, Column::DiscrepancyValue, Direction::Smallest, |r| {
        r.sign() == Sign::Underbilled
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(po: &str, value: f64, gallons: f64) -> DisputeRecord {
        DisputeRecord {
            po_number: Some(po.to_string()),
            discrepancy_value: value,
            gallons,
            ..Default::default()
        }
    }

    fn po_numbers(records: &[DisputeRecord]) -> Vec<&str> {
        records.iter().filter_map(|r| r.po_number.as_deref()).collect()
    }

    fn sample() -> DisputeSet {
        DisputeSet::with_all_columns(vec![
            record("A", 10.0, 500.0),
            record("B", -25.0, 100.0),
            record("C", 40.0, 50.0),
            record("D", 10.0, 900.0),
            record("E", 0.0, 10.0),
        ])
    }

    #[test]
    fn test_largest_with_stable_ties() {
        let top = top_n(&sample(), 3, "discrepancy_value", Direction::Largest);
        assert_eq!(po_numbers(&top), vec!["C", "A", "D"]);
    }

    #[test]
    fn test_smallest_first_for_underbilled() {
        let top = top_n(&sample(), 2, "discrepancy_value", Direction::Smallest);
        assert_eq!(po_numbers(&top), vec!["B", "E"]);
    }

    #[test]
    fn test_other_numeric_sort_field() {
        let top = top_n(&sample(), 2, "gallons", Direction::Largest);
        assert_eq!(po_numbers(&top), vec!["D", "A"]);
    }

    #[test]
    fn test_unknown_sort_field_falls_back() {
        let set = sample();
        let fallback = top_n(&set, 5, "no_such_column", Direction::Largest);
        let default = top_n(&set, 5, DEFAULT_SORT_FIELD, Direction::Largest);
        assert_eq!(fallback, default);

        // categorical columns cannot rank
        let by_site = top_n(&set, 5, "siteName", Direction::Largest);
        assert_eq!(by_site, default);
    }

    #[test]
    fn test_n_larger_than_set_and_zero() {
        assert_eq!(top_n(&sample(), 50, DEFAULT_SORT_FIELD, Direction::Largest).len(), 5);
        assert!(top_n(&sample(), 0, DEFAULT_SORT_FIELD, Direction::Largest).is_empty());
        let empty = DisputeSet::default();
        assert!(top_n(&empty, 3, DEFAULT_SORT_FIELD, Direction::Largest).is_empty());
    }

    #[test]
    fn test_sign_restricted_selections() {
        let set = sample();
        assert_eq!(po_numbers(&top_savings(&set, 10)), vec!["C", "A", "D"]);
        assert_eq!(po_numbers(&top_underbilled(&set, 10)), vec!["B"]);
    }
}
