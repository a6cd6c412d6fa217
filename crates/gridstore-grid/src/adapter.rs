//! Row/column addressed operations over one spreadsheet resource
//!
//! Reads go through the snapshot cache (or a direct range read when
//! `fresh` is requested). Every successful mutation invalidates the cache,
//! so the next read reflects it.

use crate::address::{
    a1_range, data_to_value, parse_a1_range, RangeRef, RowData, LAST_COLUMN,
};
use crate::cache::SnapshotCache;
use crate::snapshot::{format_number, parse_sheet_properties, SheetProperties, Snapshot};
use crate::transport::{Method, Transport};
use chrono::{DateTime, Utc};
use gridstore_common::{GridStoreConfig, GridStoreError, Result, ValueInputOption};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Selects a sheet by numeric id or by title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Id(i64),
    /// Tried as a numeric id first when the text parses as one
    Title(String),
}

impl From<i64> for SheetSelector {
    fn from(id: i64) -> Self {
        SheetSelector::Id(id)
    }
}

impl From<&str> for SheetSelector {
    fn from(title: &str) -> Self {
        SheetSelector::Title(title.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(title: String) -> Self {
        SheetSelector::Title(title)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Id(id) => write!(f, "#{}", id),
            SheetSelector::Title(title) => write!(f, "'{}'", title),
        }
    }
}

/// Options for `GridAdapter::list`
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub sheet: Option<SheetSelector>,
    /// First row to return (1-based)
    pub start: u32,
    /// Maximum number of rows; `None` reads to the end
    pub limit: Option<usize>,
    /// Bypass the snapshot with a direct range read
    pub fresh: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            start: 1,
            limit: None,
            fresh: false,
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, sheet: Option<SheetSelector>) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }
}

/// Rows written by an append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendResult {
    pub start_row: u32,
    pub end_row: u32,
    pub count: usize,
}

/// New contents for one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    /// 1-based row number
    pub row: u32,
    pub data: RowData,
}

impl RowUpdate {
    pub fn new(row: u32, data: RowData) -> Self {
        Self { row, data }
    }

    /// Updates from a mapping of row number to row data
    pub fn from_map(map: BTreeMap<u32, RowData>) -> Vec<RowUpdate> {
        map.into_iter().map(RowUpdate::from).collect()
    }
}

impl From<(u32, RowData)> for RowUpdate {
    fn from((row, data): (u32, RowData)) -> Self {
        Self { row, data }
    }
}

/// Counts removed by a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteResult {
    pub rows: usize,
    pub columns: usize,
}

/// File-level metadata of the spreadsheet resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Grid adapter for one spreadsheet resource
pub struct GridAdapter {
    transport: Arc<dyn Transport>,
    spreadsheet_id: String,
    default_sheet: Option<SheetSelector>,
    value_input_option: ValueInputOption,
    cache: SnapshotCache,
}

impl GridAdapter {
    /// Create an adapter for the spreadsheet named in `config`
    pub fn new(transport: Arc<dyn Transport>, config: &GridStoreConfig) -> Self {
        Self {
            transport,
            spreadsheet_id: config.spreadsheet_id.clone(),
            default_sheet: config.default_sheet.clone().map(SheetSelector::Title),
            value_input_option: config.value_input_option,
            cache: SnapshotCache::new(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Whether a snapshot is currently cached
    pub fn is_cached(&self) -> bool {
        self.cache.is_populated()
    }

    /// Drop the cached snapshot
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// The cached snapshot, fetching it when absent.
    ///
    /// A failed fetch is logged and yields `None` ("no data available");
    /// the next call retries.
    pub async fn load(&self) -> Option<Arc<Snapshot>> {
        self.fetch().await.ok()
    }

    /// Cached snapshot or a fresh fetch, keeping the cause of a failed fetch
    async fn fetch(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.cache.get() {
            return Ok(snapshot);
        }

        let params = json!({
            "spreadsheetId": self.spreadsheet_id,
            "includeGridData": true,
        });
        let fetched = self
            .transport
            .call(Method::SpreadsheetsGet, params)
            .await
            .and_then(Snapshot::from_response);

        match fetched {
            Ok(snapshot) => {
                debug!(
                    spreadsheet_id = %self.spreadsheet_id,
                    sheets = snapshot.sheets.len(),
                    "snapshot loaded"
                );
                Ok(self.cache.populate(snapshot))
            }
            Err(e) => {
                warn!(
                    spreadsheet_id = %self.spreadsheet_id,
                    error = %e,
                    "snapshot load failed, treating as no data"
                );
                Err(e)
            }
        }
    }

    /// Resolve a sheet to the loaded snapshot and its position in it.
    ///
    /// A failed snapshot load surfaces with its own cause (usually
    /// `Transport`); `NotFound` is reserved for selectors that do not
    /// resolve.
    async fn resolve(&self, selector: Option<&SheetSelector>) -> Result<(Arc<Snapshot>, usize)> {
        let selector = selector.or(self.default_sheet.as_ref());
        let snapshot = self.fetch().await?;

        let position = match selector {
            None => snapshot.position_by_id(0),
            Some(SheetSelector::Id(id)) => snapshot.position_by_id(*id),
            Some(SheetSelector::Title(title)) => title
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|id| snapshot.position_by_id(id))
                .or_else(|| snapshot.position_by_title(title)),
        };

        match position {
            Some(position) => Ok((snapshot, position)),
            None => Err(GridStoreError::NotFound(match selector {
                Some(selector) => format!("sheet {}", selector),
                None => "sheet #0".to_string(),
            })),
        }
    }

    /// Properties of the selected sheet (id 0 or the default sheet when `None`)
    pub async fn get_sheet(&self, selector: Option<&SheetSelector>) -> Result<SheetProperties> {
        let (snapshot, position) = self.resolve(selector).await?;
        Ok(snapshot.sheets[position].properties.clone())
    }

    /// Rows `[start, start + limit - 1]` of a sheet as cell text
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Vec<String>>> {
        let (snapshot, position) = self.resolve(options.sheet.as_ref()).await?;
        let sheet = &snapshot.sheets[position];
        let start = options.start.max(1);

        if options.limit == Some(0) {
            return Ok(Vec::new());
        }
        if !options.fresh {
            return Ok(sheet.slice(start, options.limit));
        }

        let end_row = options
            .limit
            .map(|limit| start.saturating_add(limit as u32 - 1));
        let range = RangeRef::cell(&sheet.properties.title, 1, start).to(LAST_COLUMN, end_row);
        debug!(range = %range, "fresh range read");

        let response = self
            .transport
            .call(
                Method::ValuesGet,
                json!({
                    "spreadsheetId": self.spreadsheet_id,
                    "range": range.to_string(),
                }),
            )
            .await?;

        Ok(parse_values(&response))
    }

    /// Append rows after the existing content of a sheet.
    ///
    /// The starting row comes from the range the service reports. When the
    /// service anchored the rows at a column other than A, one corrective
    /// write moves them back to column A.
    pub async fn append(
        &self,
        rows: &[RowData],
        sheet: Option<&SheetSelector>,
    ) -> Result<AppendResult> {
        if rows.is_empty() {
            return Ok(AppendResult::default());
        }

        let properties = self.get_sheet(sheet).await?;
        let values = rows
            .iter()
            .map(data_to_value)
            .collect::<Result<Vec<_>>>()?;

        let params = json!({
            "spreadsheetId": self.spreadsheet_id,
            "range": RangeRef::cell(&properties.title, 1, 1).to_string(),
            "valueInputOption": self.value_input_option.as_str(),
            "insertDataOption": "INSERT_ROWS",
            "resource": { "values": values },
        });
        let response = self.transport.call(Method::ValuesAppend, params).await?;
        self.cache.invalidate();

        let updated_range = response
            .pointer("/updates/updatedRange")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GridStoreError::Deserialization("append response has no updatedRange".to_string())
            })?;
        let range = parse_a1_range(updated_range).ok_or_else(|| {
            GridStoreError::Deserialization(format!("unreadable updatedRange '{}'", updated_range))
        })?;
        let start_row = range.start_row.ok_or_else(|| {
            GridStoreError::Deserialization(format!("updatedRange '{}' has no row", updated_range))
        })?;
        let count = values.len();
        let end_row = start_row + count as u32 - 1;

        if range.start_col != 1 {
            self.reanchor(&properties.title, range.start_col, start_row, end_row, &values)
                .await?;
        }

        info!(
            sheet = %properties.title,
            start_row,
            end_row,
            count,
            "rows appended"
        );
        Ok(AppendResult {
            start_row,
            end_row,
            count,
        })
    }

    /// Rewrite appended rows starting at column A.
    ///
    /// Each row is widened to the widest appended row, then padded with
    /// `start_col - 1` empty cells so the cells written at the wrong offset
    /// are cleared.
    async fn reanchor(
        &self,
        title: &str,
        start_col: u32,
        start_row: u32,
        end_row: u32,
        values: &[Vec<Option<String>>],
    ) -> Result<()> {
        let padding = (start_col - 1) as usize;
        let width = values.iter().map(Vec::len).max().unwrap_or(0);
        let rows: Vec<Vec<String>> = values
            .iter()
            .map(|row| {
                let mut cells: Vec<String> =
                    row.iter().map(|c| c.clone().unwrap_or_default()).collect();
                cells.resize(width + padding, String::new());
                cells
            })
            .collect();

        let range = a1_range(title, 1, start_row, (width + padding) as u32, end_row);
        warn!(range = %range, start_col, "append landed off column A, re-anchoring");

        self.transport
            .call(
                Method::ValuesBatchUpdate,
                json!({
                    "spreadsheetId": self.spreadsheet_id,
                    "resource": {
                        "valueInputOption": self.value_input_option.as_str(),
                        "data": [{ "range": range, "values": rows }],
                    },
                }),
            )
            .await?;
        self.cache.invalidate();
        Ok(())
    }

    /// Overwrite whole rows in one batched request.
    ///
    /// With `upsert`, the sheet is first grown by the largest row and column
    /// overrun so the write stays inside its bounds. Returns the number of
    /// rows written.
    pub async fn update(
        &self,
        rows: &[RowUpdate],
        sheet: Option<&SheetSelector>,
        upsert: bool,
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let properties = self.get_sheet(sheet).await?;
        let mut data = Vec::with_capacity(rows.len());
        let mut extra_rows = 0u32;
        let mut extra_columns = 0u32;

        for update in rows {
            if update.row == 0 {
                return Err(GridStoreError::InvalidArgument(
                    "row numbers are 1-based".to_string(),
                ));
            }
            let values = data_to_value(&update.data)?;
            extra_rows = extra_rows.max(update.row.saturating_sub(properties.row_count));
            extra_columns =
                extra_columns.max((values.len() as u32).saturating_sub(properties.column_count));
            data.push(json!({
                "range": RangeRef::row(&properties.title, update.row).to_string(),
                "values": [values],
            }));
        }

        if upsert {
            self.expand(properties.sheet_id, extra_rows, extra_columns)
                .await?;
        }

        self.transport
            .call(
                Method::ValuesBatchUpdate,
                json!({
                    "spreadsheetId": self.spreadsheet_id,
                    "resource": {
                        "valueInputOption": self.value_input_option.as_str(),
                        "data": data,
                    },
                }),
            )
            .await?;
        self.cache.invalidate();

        info!(sheet = %properties.title, rows = rows.len(), "rows updated");
        Ok(rows.len())
    }

    /// Delete whole rows and/or columns by physical position.
    ///
    /// Deletions run highest index first so earlier ones do not shift the
    /// rest. Duplicates are collapsed.
    pub async fn delete(
        &self,
        rows: &[u32],
        columns: &[u32],
        sheet: Option<&SheetSelector>,
    ) -> Result<DeleteResult> {
        let rows = descending_unique(rows)?;
        let columns = descending_unique(columns)?;
        if rows.is_empty() && columns.is_empty() {
            return Ok(DeleteResult::default());
        }

        let properties = self.get_sheet(sheet).await?;
        let requests: Vec<Value> = rows
            .iter()
            .map(|&r| delete_dimension(properties.sheet_id, "ROWS", r))
            .chain(
                columns
                    .iter()
                    .map(|&c| delete_dimension(properties.sheet_id, "COLUMNS", c)),
            )
            .collect();

        self.batch_update(requests).await?;
        self.cache.invalidate();

        info!(
            sheet = %properties.title,
            rows = rows.len(),
            columns = columns.len(),
            "dimensions deleted"
        );
        Ok(DeleteResult {
            rows: rows.len(),
            columns: columns.len(),
        })
    }

    /// Grow a sheet's declared dimensions. Sends nothing when both are zero.
    pub async fn expand(&self, sheet_id: i64, rows: u32, columns: u32) -> Result<()> {
        let mut requests = Vec::new();
        if rows > 0 {
            requests.push(append_dimension(sheet_id, "ROWS", rows));
        }
        if columns > 0 {
            requests.push(append_dimension(sheet_id, "COLUMNS", columns));
        }
        if requests.is_empty() {
            return Ok(());
        }

        debug!(sheet_id, rows, columns, "expanding sheet");
        self.batch_update(requests).await?;
        self.cache.invalidate();
        Ok(())
    }

    /// Create a sheet and return its properties
    pub async fn add_sheet(&self, title: &str) -> Result<SheetProperties> {
        let response = self
            .batch_update(vec![json!({
                "addSheet": { "properties": { "title": title } }
            })])
            .await?;
        self.cache.invalidate();

        let properties = response
            .pointer("/replies/0/addSheet/properties")
            .cloned()
            .ok_or_else(|| {
                GridStoreError::Deserialization("addSheet reply has no properties".to_string())
            })?;
        let properties = parse_sheet_properties(properties)?;
        info!(sheet = %properties.title, sheet_id = properties.sheet_id, "sheet added");
        Ok(properties)
    }

    /// Remove a sheet; fails with `NotFound` when the selector does not resolve
    pub async fn delete_sheet(&self, selector: &SheetSelector) -> Result<()> {
        let properties = self.get_sheet(Some(selector)).await?;
        self.batch_update(vec![json!({
            "deleteSheet": { "sheetId": properties.sheet_id }
        })])
        .await?;
        self.cache.invalidate();

        info!(sheet = %properties.title, sheet_id = properties.sheet_id, "sheet deleted");
        Ok(())
    }

    /// File metadata of the spreadsheet resource
    pub async fn metadata(&self) -> Result<FileMetadata> {
        let response = self
            .transport
            .call(
                Method::DriveFilesGet,
                json!({
                    "fileId": self.spreadsheet_id,
                    "fields": "id,name,modifiedTime",
                }),
            )
            .await?;
        serde_json::from_value(response)
            .map_err(|e| GridStoreError::Deserialization(format!("file metadata: {}", e)))
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<Value> {
        self.transport
            .call(
                Method::BatchUpdate,
                json!({
                    "spreadsheetId": self.spreadsheet_id,
                    "resource": { "requests": requests },
                }),
            )
            .await
    }
}

fn descending_unique(indices: &[u32]) -> Result<Vec<u32>> {
    if indices.contains(&0) {
        return Err(GridStoreError::InvalidArgument(
            "row and column numbers are 1-based".to_string(),
        ));
    }
    let mut sorted = indices.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    Ok(sorted)
}

fn delete_dimension(sheet_id: i64, dimension: &str, index: u32) -> Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": dimension,
                "startIndex": index - 1,
                "endIndex": index,
            }
        }
    })
}

fn append_dimension(sheet_id: i64, dimension: &str, length: u32) -> Value {
    json!({
        "appendDimension": {
            "sheetId": sheet_id,
            "dimension": dimension,
            "length": length,
        }
    })
}

/// Read the `values` matrix of a range read as cell text
fn parse_values(response: &Value) -> Vec<Vec<String>> {
    let Some(rows) = response.get("values").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(cell_text).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_unique() {
        assert_eq!(descending_unique(&[2, 5, 3, 5]).unwrap(), vec![5, 3, 2]);
        assert!(descending_unique(&[]).unwrap().is_empty());
        assert!(descending_unique(&[1, 0]).is_err());
    }

    #[test]
    fn test_parse_values() {
        let response = json!({ "values": [["a", 1, true], [], [null, 2.5]] });
        assert_eq!(
            parse_values(&response),
            vec![
                vec!["a".to_string(), "1".to_string(), "TRUE".to_string()],
                vec![],
                vec![String::new(), "2.5".to_string()],
            ]
        );
        assert!(parse_values(&json!({})).is_empty());
    }

    #[test]
    fn test_delete_dimension_indices() {
        let request = delete_dimension(7, "ROWS", 3);
        assert_eq!(request["deleteDimension"]["range"]["startIndex"], 2);
        assert_eq!(request["deleteDimension"]["range"]["endIndex"], 3);
        assert_eq!(request["deleteDimension"]["range"]["sheetId"], 7);
    }

    #[test]
    fn test_list_options_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.start, 1);
        assert!(options.limit.is_none());
        assert!(!options.fresh);
    }

    #[test]
    fn test_row_update_from_map() {
        let map = BTreeMap::from([
            (4, RowData::values(["x"])),
            (2, RowData::values(["y"])),
        ]);
        let updates = RowUpdate::from_map(map);
        assert_eq!(updates[0].row, 2);
        assert_eq!(updates[1].row, 4);
    }
}
