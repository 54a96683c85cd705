//! Engine configuration
//!
//! Read from environment variables with sensible defaults, so a terminal
//! can run with no configuration at all.

use chrono_tz::Tz;
use shared::billing::TaxRates;
use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ledger database
    pub data_dir: String,
    /// Store timezone, used for the receipt business day
    pub timezone: Tz,
    /// Standard tax rate in basis points (1000 = 10%)
    pub tax_standard_bp: u32,
    /// Reduced tax rate in basis points (800 = 8%)
    pub tax_reduced_bp: u32,
    /// Log level filter
    pub log_level: String,
    /// Optional directory for rolling log files
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("SETTLE_DATA_DIR").unwrap_or_else(|_| "/var/lib/settlement".into()),
            timezone: std::env::var("SETTLE_TIMEZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::Asia::Tokyo),
            tax_standard_bp: std::env::var("SETTLE_TAX_STANDARD_BP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            tax_reduced_bp: std::env::var("SETTLE_TAX_REDUCED_BP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(800),
            log_level: std::env::var("SETTLE_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("SETTLE_LOG_DIR").ok(),
        }
    }

    /// Path of the ledger database file
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("ledger.redb")
    }

    /// Tax rates assembled from the configured basis points
    pub fn tax_rates(&self) -> TaxRates {
        TaxRates::from_basis_points(self.tax_standard_bp, self.tax_reduced_bp)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
