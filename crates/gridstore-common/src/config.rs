//! Spreadsheet and endpoint configuration
//!
//! # Example
//! ```rust,ignore
//! use gridstore_common::GridStoreConfig;
//!
//! // From environment
//! let config = GridStoreConfig::from_env()?;
//!
//! // Or explicit configuration
//! let config = GridStoreConfig::new("1AbC...")
//!     .default_sheet("Orders")
//!     .timeout_secs(10.0);
//! ```

use crate::error::{GridStoreError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the service should interpret written values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueInputOption {
    /// Values are stored exactly as sent
    Raw,
    /// Values are parsed as if typed into the UI (numbers, dates, formulas)
    #[default]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

impl fmt::Display for ValueInputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueInputOption {
    type Err = GridStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(ValueInputOption::Raw),
            "USER_ENTERED" | "USERENTERED" => Ok(ValueInputOption::UserEntered),
            other => Err(GridStoreError::Configuration(format!(
                "Unknown value input option: '{}'. Expected RAW or USER_ENTERED",
                other
            ))),
        }
    }
}

/// Configuration for one backing spreadsheet
#[derive(Debug, Clone)]
pub struct GridStoreConfig {
    /// Identifier of the spreadsheet resource
    pub spreadsheet_id: String,

    /// Sheet used when an operation names none (id 0 when unset)
    pub default_sheet: Option<String>,

    /// Interpretation of written values
    pub value_input_option: ValueInputOption,

    /// Base URL of the sheets REST API
    pub sheets_base_url: String,

    /// Base URL of the drive REST API (file metadata)
    pub drive_base_url: String,

    /// Total request timeout for the HTTP transport
    pub timeout: Duration,
}

impl Default for GridStoreConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            default_sheet: None,
            value_input_option: ValueInputOption::default(),
            sheets_base_url: "https://sheets.googleapis.com/v4".to_string(),
            drive_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GridStoreConfig {
    /// Create a config for a spreadsheet with default endpoints
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// - `GRIDSTORE_SPREADSHEET_ID` (required)
    /// - `GRIDSTORE_DEFAULT_SHEET`
    /// - `GRIDSTORE_VALUE_INPUT_OPTION` (`RAW` or `USER_ENTERED`)
    /// - `GRIDSTORE_SHEETS_URL`, `GRIDSTORE_DRIVE_URL`
    /// - `GRIDSTORE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let spreadsheet_id = lookup("GRIDSTORE_SPREADSHEET_ID")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                GridStoreError::Configuration("GRIDSTORE_SPREADSHEET_ID is not set".to_string())
            })?;

        let mut config = Self::new(spreadsheet_id);
        config.default_sheet = lookup("GRIDSTORE_DEFAULT_SHEET");

        if let Some(option) = lookup("GRIDSTORE_VALUE_INPUT_OPTION") {
            config.value_input_option = option.parse()?;
        }
        if let Some(url) = lookup("GRIDSTORE_SHEETS_URL") {
            config.sheets_base_url = url;
        }
        if let Some(url) = lookup("GRIDSTORE_DRIVE_URL") {
            config.drive_base_url = url;
        }
        if let Some(secs) = lookup("GRIDSTORE_TIMEOUT_SECS") {
            let invalid = |reason: String| {
                GridStoreError::Configuration(format!(
                    "Invalid GRIDSTORE_TIMEOUT_SECS '{}': {}",
                    secs, reason
                ))
            };
            let value: f64 = secs.trim().parse().map_err(|_| invalid("not a number".into()))?;
            config.timeout =
                Duration::try_from_secs_f64(value).map_err(|e| invalid(e.to_string()))?;
        }

        Ok(config)
    }

    /// Set the default sheet (title or numeric id)
    pub fn default_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.default_sheet = Some(sheet.into());
        self
    }

    /// Set the value input option
    pub fn value_input_option(mut self, option: ValueInputOption) -> Self {
        self.value_input_option = option;
        self
    }

    /// Set the sheets API base URL
    pub fn sheets_base_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_base_url = url.into();
        self
    }

    /// Set the drive API base URL
    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.drive_base_url = url.into();
        self
    }

    /// Set the total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout from seconds; negative, NaN or infinite values are ignored
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        if let Ok(timeout) = Duration::try_from_secs_f64(secs) {
            self.timeout = timeout;
        }
        self
    }
}
