use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use disputes_dashboard::config::parse_top_n;
use disputes_dashboard::time::DEFAULT_DATE_FIELD;
use disputes_dashboard::{
    by_category, by_time, category_impact, summary_metrics, top_savings, top_underbilled,
    write_disputes, DashboardConfig, DatasetCache, DisputeFilter, Granularity, IntoFrame,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "disputes-dashboard")]
#[command(about = "Savings vs underbilled analysis of billing disputes")]
struct Args {
    /// Path to the disputes CSV (or set DISPUTES_DATA_FILE)
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Column for the category breakdown (discrepancy_type, customerName, item, siteName, ...)
    #[arg(short, long)]
    category: Option<String>,

    /// Time bucket width: day, week or month
    #[arg(short, long)]
    granularity: Option<String>,

    /// Number of top savings / underbilled disputes to show
    #[arg(short, long)]
    top: Option<String>,

    /// Only disputes with this status
    #[arg(long)]
    status: Option<String>,

    /// Only disputes of this discrepancy type
    #[arg(long = "type")]
    discrepancy_type: Option<String>,

    /// Only disputes of this customer
    #[arg(long)]
    customer: Option<String>,

    /// First dispute date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last dispute date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Write the filtered disputes to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the summary metrics as JSON only
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply_to(&self, mut config: DashboardConfig) -> Result<DashboardConfig> {
        if let Some(path) = &self.data_file {
            config.data_file = path.clone();
        }
        if let Some(field) = &self.category {
            config.category_field = field.clone();
        }
        if let Some(raw) = &self.granularity {
            config.granularity = raw.parse::<Granularity>()?;
        }
        if let Some(raw) = &self.top {
            config.top_n = parse_top_n(raw)?;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.apply_to(DashboardConfig::from_env()?)?;
    info!("Loading disputes from {}", config.data_file.display());

    let mut cache = DatasetCache::new();
    let all = cache
        .get_or_load(&config.data_file)
        .with_context(|| format!("Failed to load {}", config.data_file.display()))?;

    let mut filter = DisputeFilter {
        status: args.status.clone(),
        discrepancy_type: args.discrepancy_type.clone(),
        customer: args.customer.clone(),
        date_range: None,
    };
    if args.from.is_some() || args.to.is_some() {
        if let Some((min, max)) = all.date_bounds() {
            filter.date_range = Some((args.from.unwrap_or(min), args.to.unwrap_or(max)));
        }
    }
    let disputes = filter.apply(&all);
    info!("{} of {} disputes selected", disputes.len(), all.len());

    let metrics = summary_metrics(&disputes)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("\n=== Key Metrics ===");
    println!(
        "Total disputes:    {} ({} savings)",
        metrics.total_disputes, metrics.disputes_with_positive_value
    );
    println!("Total savings:     ${:.2}", metrics.total_positive_discrepancy);
    println!("Total underbilled: ${:.2}", metrics.total_negative_discrepancy);
    println!(
        "Net impact:        ${:.2} ({} underbilled)",
        metrics.total_discrepancy_value, metrics.disputes_with_negative_value
    );
    println!("{}", metrics.to_frame()?);

    println!("\n=== By {} ===", config.category_field);
    let categories = by_category(&disputes, &config.category_field)?;
    if categories.is_missing_column() {
        println!("Column '{}' not available in this dataset", config.category_field);
    } else {
        println!("{}", categories.to_frame()?);
        let impact = category_impact(&disputes, &config.category_field, 15)?;
        println!("{}", impact.to_frame()?);
    }

    println!("\n=== By {} ===", config.granularity);
    let buckets = by_time(&disputes, DEFAULT_DATE_FIELD, config.granularity)?;
    if buckets.is_empty() {
        println!("No dated disputes");
    } else {
        println!("{}", buckets.to_frame()?);
    }

    println!("\n=== Top {} Savings ===", config.top_n);
    println!("{}", top_savings(&disputes, config.top_n).to_frame()?);

    println!("\n=== Top {} Underbilled ===", config.top_n);
    println!("{}", top_underbilled(&disputes, config.top_n).to_frame()?);

    if let Some(path) = &args.export {
        write_disputes(path, disputes.records())
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        info!("Exported {} disputes to {}", disputes.len(), path.display());
    }

    Ok(())
}
