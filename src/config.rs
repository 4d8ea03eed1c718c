//! Run configuration, read once at startup from environment variables.
//!
//! Required keys are `ORDERS_API_URL`, `INVENTORY_API_URL` and `SHEET_NAME`;
//! every other key has a default. Validation happens in [`Config::from_lookup`]
//! so a bad configuration is rejected before any network call.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{Result, SyncError};
use crate::sheets::{Anchor, MAX_COLUMNS, MAX_ROWS};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const OAUTH_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";

pub const DEFAULT_ORDERS_WORKSHEET: &str = "Orders";
pub const DEFAULT_INVENTORY_WORKSHEET: &str = "Inventory";
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Where one dataset's table lands in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetTarget {
    pub worksheet: String,
    pub anchor: Anchor,
}

/// Validated settings for a single run.
#[derive(Debug, Clone)]
pub struct Config {
    pub orders_url: Url,
    pub inventory_url: Url,
    pub sheet_name: String,
    pub orders: WorksheetTarget,
    pub inventory: WorksheetTarget,
    pub credentials_file: PathBuf,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub http_timeout: Duration,
    pub create_missing_worksheet: bool,
    pub strict_conversion: bool,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated the same as missing ones. All required keys
    /// are checked before any other value is parsed, so the error names
    /// every missing key at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let missing: Vec<&str> = ["ORDERS_API_URL", "INVENTORY_API_URL", "SHEET_NAME"]
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let orders_url = parse_url("ORDERS_API_URL", get("ORDERS_API_URL"))?;
        let inventory_url = parse_url("INVENTORY_API_URL", get("INVENTORY_API_URL"))?;
        let sheet_name = get("SHEET_NAME").unwrap_or_default();

        let orders = WorksheetTarget {
            worksheet: get("ORDERS_WORKSHEET_NAME")
                .unwrap_or_else(|| DEFAULT_ORDERS_WORKSHEET.to_string()),
            anchor: parse_anchor(&get, "ORDERS_START_ROW", "ORDERS_START_COL")?,
        };
        let inventory = WorksheetTarget {
            worksheet: get("INVENTORY_WORKSHEET_NAME")
                .unwrap_or_else(|| DEFAULT_INVENTORY_WORKSHEET.to_string()),
            anchor: parse_anchor(&get, "INVENTORY_START_ROW", "INVENTORY_START_COL")?,
        };

        let max_retries: u32 =
            parse_number("MAX_RETRIES", get("MAX_RETRIES"), DEFAULT_MAX_RETRIES)?;
        if max_retries == 0 {
            return Err(SyncError::Config(
                "MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        let retry_delay: u64 =
            parse_number("RETRY_DELAY", get("RETRY_DELAY"), DEFAULT_RETRY_DELAY_SECS)?;
        let http_timeout: u64 =
            parse_number("HTTP_TIMEOUT", get("HTTP_TIMEOUT"), DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout == 0 {
            return Err(SyncError::Config(
                "HTTP_TIMEOUT must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            orders_url,
            inventory_url,
            sheet_name,
            orders,
            inventory,
            credentials_file: PathBuf::from(
                get("CREDENTIALS_FILE_NAME")
                    .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string()),
            ),
            max_retries,
            retry_delay: Duration::from_secs(retry_delay),
            http_timeout: Duration::from_secs(http_timeout),
            create_missing_worksheet: parse_bool(
                "CREATE_MISSING_WORKSHEET",
                get("CREATE_MISSING_WORKSHEET"),
            )?,
            strict_conversion: parse_bool("STRICT_CONVERSION", get("STRICT_CONVERSION"))?,
        })
    }
}

/// Directory for per-run log files: `LOG_DIR`, or `logs` when unset or
/// blank. Read separately from [`Config`] so logging can start before the
/// rest of the configuration is validated.
pub fn log_dir_from_lookup<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(non_blank(lookup("LOG_DIR")).unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_url(key: &str, value: Option<String>) -> Result<Url> {
    let raw = value.unwrap_or_default();
    Url::parse(&raw)
        .map_err(|e| SyncError::Config(format!("{} is not a valid URL ({}): {}", key, raw, e)))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            SyncError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(SyncError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

fn parse_anchor<F>(get: &F, row_key: &str, col_key: &str) -> Result<Anchor>
where
    F: Fn(&str) -> Option<String>,
{
    let row: u32 = parse_number(row_key, get(row_key), 1)?;
    let col: u32 = parse_number(col_key, get(col_key), 1)?;
    Anchor::new(row, col).ok_or_else(|| {
        SyncError::Config(format!(
            "{}/{} must be within rows 1..={} and columns 1..={}, got row {} column {}",
            row_key, col_key, MAX_ROWS, MAX_COLUMNS, row, col
        ))
    })
}
