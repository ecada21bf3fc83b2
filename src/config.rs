//! Dashboard configuration
//!
//! Defaults, overridden by environment variables (a `.env` file is read when
//! present) and then by command-line flags.

use crate::error::{DashboardError, Result};
use crate::loader::DEFAULT_DATA_FILE;
use crate::time::Granularity;
use std::path::PathBuf;

pub const ENV_DATA_FILE: &str = "DISPUTES_DATA_FILE";
pub const ENV_CATEGORY: &str = "DISPUTES_CATEGORY";
pub const ENV_GRANULARITY: &str = "DISPUTES_GRANULARITY";
pub const ENV_TOP_N: &str = "DISPUTES_TOP_N";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data_file: PathBuf,
    /// Column used for the category breakdown
    pub category_field: String,
    pub granularity: Granularity,
    /// Rows in the top savings / underbilled tables
    pub top_n: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            category_field: "discrepancy_type".to_string(),
            granularity: Granularity::Month,
            top_n: 10,
        }
    }
}

impl DashboardConfig {
    /// Load `.env` if present and read configuration from the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_DATA_FILE) {
            config.data_file = PathBuf::from(path);
        }
        if let Some(field) = lookup(ENV_CATEGORY) {
            config.category_field = field;
        }
        if let Some(raw) = lookup(ENV_GRANULARITY) {
            config.granularity = raw
                .parse()
                .map_err(|e| DashboardError::Config(format!("{}: {}", ENV_GRANULARITY, e)))?;
        }
        if let Some(raw) = lookup(ENV_TOP_N) {
            config.top_n = parse_top_n(&raw)?;
        }
        Ok(config)
    }
}

/// Parse a top-N count; negative or non-numeric values are rejected
pub fn parse_top_n(raw: &str) -> Result<usize> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        DashboardError::Config(format!("{} must be an integer, got '{}'", ENV_TOP_N, raw))
    })?;
    usize::try_from(value).map_err(|_| {
        DashboardError::Config(format!("{} must not be negative, got {}", ENV_TOP_N, value))
    })
}
