//! Environment-driven application configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::fetcher::DEFAULT_USER_AGENT;

pub struct AppConfig {
    /// Root for the `page/` cache and `shop/` workbooks
    pub data_dir: PathBuf,
    pub base_currency: String,
    pub rates_url: String,
    pub sheets_url: String,
    /// Drive API root, used to resolve spreadsheet titles to file ids
    pub drive_url: String,
    pub sheets_token: Option<String>,
    /// Worksheet holding one "last refreshed" row per shop
    pub status_sheet: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl AppConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("page")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("shop")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("base_currency", &self.base_currency)
            .field("rates_url", &self.rates_url)
            .field("sheets_url", &self.sheets_url)
            .field("drive_url", &self.drive_url)
            .field(
                "sheets_token",
                &self.sheets_token.as_ref().map(|_| "[redacted]"),
            )
            .field("status_sheet", &self.status_sheet)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Load configuration from the process environment, after `.env`.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Builds the configuration from an env-var lookup function, so parsing can
/// be tested with a plain map.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let base_currency = or_default("BGSHOPS_BASE_CURRENCY", "HUF").to_uppercase();
    if base_currency.len() != 3 || !base_currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidEnvVar {
            var: "BGSHOPS_BASE_CURRENCY".to_string(),
            reason: format!("{base_currency:?} is not an ISO 4217 code"),
        });
    }

    Ok(AppConfig {
        data_dir: PathBuf::from(or_default("BGSHOPS_DATA_DIR", "./data")),
        base_currency,
        rates_url: or_default("BGSHOPS_RATES_URL", "https://api.frankfurter.app"),
        sheets_url: or_default("BGSHOPS_SHEETS_URL", "https://sheets.googleapis.com/v4"),
        drive_url: or_default("BGSHOPS_DRIVE_URL", "https://www.googleapis.com/drive/v3"),
        sheets_token: lookup("BGSHOPS_SHEETS_TOKEN").ok().filter(|t| !t.is_empty()),
        status_sheet: or_default("BGSHOPS_STATUS_SHEET", "TS"),
        user_agent: or_default("BGSHOPS_USER_AGENT", DEFAULT_USER_AGENT),
        request_timeout_secs: parse_u64("BGSHOPS_REQUEST_TIMEOUT_SECS", "30")?,
        log_level: or_default("BGSHOPS_LOG_LEVEL", "info"),
    })
}
