pub mod aggregation;
pub mod cache;
pub mod category;
pub mod config;
pub mod error;
pub mod filter;
pub mod frame;
pub mod loader;
pub mod metrics;
pub mod record;
pub mod time;
pub mod top;

pub use aggregation::Aggregation;
pub use cache::DatasetCache;
pub use category::{by_category, category_impact, CategoryImpact, CategoryRow};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use filter::DisputeFilter;
pub use frame::IntoFrame;
pub use loader::{load_disputes, load_disputes_from_reader, write_disputes};
pub use metrics::{summary_metrics, SummaryMetrics};
pub use record::{Column, ColumnKind, DisputeRecord, DisputeSet, Sign};
pub use time::{by_time, Granularity, TimeBucket};
pub use top::{top_n, top_savings, top_underbilled, Direction};
