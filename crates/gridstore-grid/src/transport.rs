//! Transport boundary to the remote tabular-data service

use async_trait::async_trait;
use gridstore_common::Result;
use serde_json::Value;
use std::fmt;

/// Remote methods the adapter relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Full spreadsheet read, optionally with grid data
    SpreadsheetsGet,
    /// Read one value range
    ValuesGet,
    /// Append rows after the table found in a range
    ValuesAppend,
    /// Write several value ranges in one request
    ValuesBatchUpdate,
    /// Structural requests (dimensions, sheets)
    BatchUpdate,
    /// File metadata
    DriveFilesGet,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::SpreadsheetsGet => "spreadsheets.get",
            Method::ValuesGet => "spreadsheets.values.get",
            Method::ValuesAppend => "spreadsheets.values.append",
            Method::ValuesBatchUpdate => "spreadsheets.values.batchUpdate",
            Method::BatchUpdate => "spreadsheets.batchUpdate",
            Method::DriveFilesGet => "drive.files.get",
        }
    }

    /// Whether the method changes the remote resource
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Method::ValuesAppend | Method::ValuesBatchUpdate | Method::BatchUpdate
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single asynchronous call against the remote service.
///
/// Path and query parameters (`spreadsheetId`, `range`, `valueInputOption`,
/// ...) sit at the top level of `params`; a request body goes under
/// `resource`. Implementations map every failure to
/// `GridStoreError::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: Method, params: Value) -> Result<Value>;
}
