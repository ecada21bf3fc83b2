use chrono::{NaiveDate, NaiveDateTime};
use disputes_dashboard::{
    by_category, by_time, load_disputes, load_disputes_from_reader, summary_metrics, top_n,
    write_disputes, Column, DatasetCache, Direction, DisputeFilter, DisputeRecord, DisputeSet,
    Granularity, IntoFrame,
};
use std::io::Write;

const EPSILON: f64 = 1e-6;

const DISPUTES_CSV: &str = "\
po_number,customerName,siteName,item,discrepancy_type,discrepancy_status,discrepancy_value,gallons,expected_rate,billed_rate,difference_per_unit,disputedAt,overriddenAt,archivedAt
PO-100,Acme Fuels,Depot 1,Diesel,rate,open,250.75,5000,3.10,3.15,0.05,2024-01-02T09:00:00Z,,
PO-101,Acme Fuels,Depot 2,Diesel,rate,closed,-80.00,2000,3.10,3.06,-0.04,2024-01-02T15:30:00Z,,
PO-102,Beta Logistics,Depot 1,Gasoline,tax,open,45.10,900,2.80,2.85,0.05,2024-01-09 11:00:00,2024-01-10 08:00:00,
PO-103,Beta Logistics,Depot 3,Gasoline,tax,open,-12.40,300,2.80,2.76,-0.04,not-a-date,,
PO-104,,Depot 3,Diesel,freight,closed,0,1200,3.00,3.00,0,2024-02-20,,2024-03-01
PO-105,Gamma Co,Depot 2,DEF,rate,open,310.00,,1.50,1.80,0.30,2024-03-01T00:00:00Z,,
PO-106,Acme Fuels,Depot 1,Diesel,freight,open,oops,800,3.10,3.10,0,2024-03-15T12:00:00Z,,
";

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn record(category: Option<&str>, value: f64, at: Option<&str>) -> DisputeRecord {
    DisputeRecord {
        discrepancy_type: category.map(str::to_string),
        discrepancy_value: value,
        gallons: value.abs() * 10.0,
        ..Default::default()
    }
    .with_disputed_at(at.map(ts))
}

fn mixed_set() -> DisputeSet {
    DisputeSet::with_all_columns(vec![
        record(Some("rate"), 120.0, Some("2024-01-01 10:00:00")),
        record(Some("tax"), -35.5, Some("2024-01-04 09:00:00")),
        record(Some("rate"), -10.25, None),
        record(Some("freight"), 0.0, Some("2024-01-20 23:59:59")),
        record(Some("tax"), 64.0, Some("2024-02-11 00:00:00")),
        record(Some("rate"), 120.0, Some("2024-02-12 13:00:00")),
    ])
}

#[test]
fn test_scenario_a_sign_partitions() {
    let set = DisputeSet::with_all_columns(vec![
        DisputeRecord::with_value(100.0),
        DisputeRecord::with_value(-50.0),
        DisputeRecord::with_value(0.0),
    ]);
    let metrics = summary_metrics(&set).unwrap();

    assert_eq!(metrics.total_positive_discrepancy, 100.0);
    assert_eq!(metrics.total_negative_discrepancy, 50.0);
    assert_eq!(metrics.total_discrepancy_value, 50.0);
}

#[test]
fn test_scenario_b_category_sum() {
    let set = DisputeSet::with_all_columns(vec![
        record(Some("X"), 30.0, None),
        record(Some("X"), -10.0, None),
    ]);
    let rows = by_category(&set, "discrepancy_type").unwrap().into_rows();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category.as_deref(), Some("X"));
    assert_eq!(rows[0].total_discrepancy, 20.0);
    assert_eq!(rows[0].count, 2);
}

#[test]
fn test_scenario_c_empty_set() {
    let set = DisputeSet::default();

    assert_eq!(summary_metrics(&set).unwrap().total_disputes, 0);
    assert!(by_category(&set, "anyField").unwrap().is_empty());
    assert!(by_time(&set, "anyField", Granularity::Day).unwrap().is_empty());

    // same for an empty set that does carry the columns
    let set = DisputeSet::with_all_columns(vec![]);
    assert!(by_category(&set, "customerName").unwrap().is_empty());
    assert!(by_time(&set, "disputedAt", Granularity::Day).unwrap().is_empty());
    assert!(top_n(&set, 5, "discrepancy_value", Direction::Largest).is_empty());
}

#[test]
fn test_scenario_d_daily_gap_bucket() {
    let set = DisputeSet::with_all_columns(vec![
        record(Some("rate"), 5.0, Some("2024-01-01 08:00:00")),
        record(Some("rate"), 7.0, Some("2024-01-03 18:00:00")),
    ]);
    let rows = by_time(&set, "disputedAt", Granularity::Day).unwrap().into_rows();

    let days: Vec<NaiveDate> = rows.iter().map(|r| r.bucket_start.date()).collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ]
    );
    assert_eq!(rows[1].dispute_count, 0);
}

#[test]
fn test_total_disputes_matches_count() {
    let set = mixed_set();
    assert_eq!(summary_metrics(&set).unwrap().total_disputes, set.len());
}

#[test]
fn test_partitions_reconstruct_signed_total() {
    let metrics = summary_metrics(&mixed_set()).unwrap();
    let reconstructed = metrics.total_positive_discrepancy - metrics.total_negative_discrepancy;
    assert!((reconstructed - metrics.total_discrepancy_value).abs() < EPSILON);
}

#[test]
fn test_category_totals_reconcile_with_summary() {
    let set = mixed_set();
    let rows = by_category(&set, "discrepancy_type").unwrap().into_rows();

    assert!(rows.len() <= set.options(Column::DiscrepancyType).len());
    let sum: f64 = rows.iter().map(|r| r.total_discrepancy).sum();
    assert!((sum - summary_metrics(&set).unwrap().total_discrepancy_value).abs() < 0.01);

    let totals: Vec<f64> = rows.iter().map(|r| r.total_discrepancy).collect();
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_time_buckets_sum_dated_records_only() {
    let set = mixed_set();
    let dated_total: f64 = set
        .iter()
        .filter(|r| r.disputed_at.is_some())
        .map(|r| r.discrepancy_value)
        .sum();

    for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
        let rows = by_time(&set, "disputedAt", granularity).unwrap().into_rows();
        let bucket_total: f64 = rows.iter().map(|r| r.total_discrepancy).sum();
        let bucket_count: usize = rows.iter().map(|r| r.dispute_count).sum();

        assert!((bucket_total - dated_total).abs() < EPSILON, "{}", granularity);
        assert_eq!(bucket_count, 5, "{}", granularity);
        assert!(rows.windows(2).all(|w| w[0].bucket_start < w[1].bucket_start));
    }
}

#[test]
fn test_top_n_is_sorted_subsequence() {
    let set = mixed_set();
    let top = top_n(&set, 3, "discrepancy_value", Direction::Largest);

    assert!(top.len() <= 3);
    let max = set.iter().map(|r| r.discrepancy_value).fold(f64::MIN, f64::max);
    assert_eq!(top[0].discrepancy_value, max);
    assert!(top.windows(2).all(|w| w[0].discrepancy_value >= w[1].discrepancy_value));
    // tie at 120.0 keeps original order
    assert_eq!(top[0], set.records()[0]);
    assert_eq!(top[1], set.records()[5]);
}

#[test]
fn test_aggregators_are_idempotent() {
    let set = mixed_set();
    let before = set.clone();

    assert_eq!(summary_metrics(&set).unwrap(), summary_metrics(&set).unwrap());
    assert_eq!(
        by_category(&set, "discrepancy_type").unwrap(),
        by_category(&set, "discrepancy_type").unwrap()
    );
    assert_eq!(
        by_time(&set, "disputedAt", Granularity::Week).unwrap(),
        by_time(&set, "disputedAt", Granularity::Week).unwrap()
    );
    assert_eq!(
        top_n(&set, 4, "gallons", Direction::Smallest),
        top_n(&set, 4, "gallons", Direction::Smallest)
    );
    assert_eq!(set, before);
}

#[test]
fn test_csv_end_to_end() {
    let set = load_disputes_from_reader(DISPUTES_CSV.as_bytes()).unwrap();
    assert_eq!(set.len(), 7);

    let metrics = summary_metrics(&set).unwrap();
    assert_eq!(metrics.disputes_with_positive_value, 3);
    assert_eq!(metrics.disputes_with_negative_value, 2);
    assert!((metrics.total_positive_discrepancy - 605.85).abs() < EPSILON);
    assert!((metrics.total_negative_discrepancy - 92.4).abs() < EPSILON);

    // unparseable value coerced to 0, unparseable date to null
    assert_eq!(set.records()[6].discrepancy_value, 0.0);
    assert_eq!(set.records()[3].disputed_at, None);
    assert_eq!(set.records()[5].gallons, 0.0);

    let customers = by_category(&set, "customerName").unwrap().into_rows();
    let unspecified = customers.iter().find(|r| r.category.is_none()).unwrap();
    assert_eq!(unspecified.count, 1);

    let months = by_time(&set, "disputedAt", Granularity::Month).unwrap().into_rows();
    assert_eq!(months.len(), 3);
    assert_eq!(months[0].dispute_count, 3);
    assert!((months[0].savings - 295.85).abs() < EPSILON);
    assert!((months[0].underbilled - 80.0).abs() < EPSILON);

    let archived = by_time(&set, "archivedAt", Granularity::Day).unwrap().into_rows();
    assert_eq!(archived.len(), 1);
}

#[test]
fn test_filter_then_aggregate() {
    let set = load_disputes_from_reader(DISPUTES_CSV.as_bytes()).unwrap();
    let acme = DisputeFilter::new().with_customer("Acme Fuels").apply(&set);

    assert_eq!(acme.len(), 3);
    let metrics = summary_metrics(&acme).unwrap();
    assert!((metrics.total_discrepancy_value - 170.75).abs() < EPSILON);

    let january = DisputeFilter::new()
        .with_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .apply(&set);
    assert_eq!(january.len(), 3);
}

#[test]
fn test_missing_columns_from_source() {
    let csv = "po_number,discrepancy_value,gallons\nPO-1,10,100\nPO-2,-4,50\n";
    let set = load_disputes_from_reader(csv.as_bytes()).unwrap();

    assert!(by_category(&set, "customerName").unwrap().is_missing_column());
    assert!(by_time(&set, "disputedAt", Granularity::Month).unwrap().is_missing_column());
    assert_eq!(by_category(&set, "customerName").unwrap().to_frame().unwrap().height(), 0);

    let top = top_n(&set, 1, "billed_rate", Direction::Largest);
    assert_eq!(top[0].po_number.as_deref(), Some("PO-1"));
}

#[test]
fn test_file_load_cache_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("disputes.csv");
    std::fs::File::create(&source)
        .unwrap()
        .write_all(DISPUTES_CSV.as_bytes())
        .unwrap();

    let mut cache = DatasetCache::new();
    let set = cache.get_or_load(&source).unwrap();
    assert_eq!(set.len(), 7);

    let exported = dir.path().join("filtered.csv");
    let savings_only: Vec<DisputeRecord> = set
        .iter()
        .filter(|r| r.discrepancy_value > 0.0)
        .cloned()
        .collect();
    write_disputes(&exported, &savings_only).unwrap();

    let reloaded = load_disputes(&exported).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.records()[0].po_number.as_deref(), Some("PO-100"));
    assert_eq!(reloaded.records()[0].disputed_at, savings_only[0].disputed_at);
    assert_eq!(
        summary_metrics(&reloaded).unwrap().total_discrepancy_value,
        summary_metrics(&set.derive(savings_only)).unwrap().total_discrepancy_value
    );
}

#[test]
fn test_export_empty_selection_writes_header() {
    let dir = tempfile::tempdir().unwrap();
    let exported = dir.path().join("empty.csv");
    write_disputes(&exported, &[]).unwrap();

    let reloaded = load_disputes(&exported).unwrap();
    assert!(reloaded.is_empty());
    assert!(reloaded.has_column(Column::DisputedAt));
}
