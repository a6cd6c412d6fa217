//! In-process transport over an in-memory grid
//!
//! Implements the same six methods as the remote service closely enough
//! for the adapter's algorithms: declared sheet dimensions are enforced on
//! value writes, `null` cells are skipped, and an append reports the range
//! it wrote. Every call is recorded for inspection.

use crate::address::{column_to_letter, parse_a1_range, RangeRef};
use crate::snapshot::format_number;
use crate::transport::{Method, Transport};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gridstore_common::{GridStoreError, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};

const DEFAULT_ROWS: u32 = 1000;
const DEFAULT_COLUMNS: u32 = 26;

#[derive(Debug, Clone)]
struct MemorySheet {
    sheet_id: i64,
    title: String,
    row_count: u32,
    column_count: u32,
    cells: Vec<Vec<String>>,
}

impl MemorySheet {
    fn new(sheet_id: i64, title: &str) -> Self {
        Self {
            sheet_id,
            title: title.to_string(),
            row_count: DEFAULT_ROWS,
            column_count: DEFAULT_COLUMNS,
            cells: Vec::new(),
        }
    }

    fn cell(&self, row: u32, col: u32) -> &str {
        self.cells
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn set(&mut self, row: u32, col: u32, value: String) {
        let (r, c) = (row as usize - 1, col as usize - 1);
        if self.cells.len() <= r {
            self.cells.resize(r + 1, Vec::new());
        }
        let cells = &mut self.cells[r];
        if cells.len() <= c {
            cells.resize(c + 1, String::new());
        }
        cells[c] = value;
    }

    /// Last row holding any non-empty cell (0 when the sheet is blank)
    fn last_row(&self) -> u32 {
        self.cells
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    /// Rows with trailing empty cells and trailing empty rows removed
    fn trimmed(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self.cells.iter().map(|r| trim_row(r.clone())).collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        rows
    }

    fn properties(&self, index: usize) -> Value {
        json!({
            "sheetId": self.sheet_id,
            "title": self.title,
            "index": index,
            "gridProperties": {
                "rowCount": self.row_count,
                "columnCount": self.column_count,
            }
        })
    }
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(String::is_empty) {
        row.pop();
    }
    row
}

#[derive(Debug)]
struct MemoryState {
    spreadsheet_id: String,
    title: String,
    sheets: Vec<MemorySheet>,
    next_sheet_id: i64,
    calls: Vec<(Method, Value)>,
    fail_next: usize,
    append_column_offset: u32,
    modified: DateTime<Utc>,
}

/// In-memory stand-in for the remote service
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    /// A spreadsheet with one blank sheet titled `Sheet1` (id 0, 1000x26)
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                spreadsheet_id: spreadsheet_id.into(),
                title: "Untitled spreadsheet".to_string(),
                sheets: vec![MemorySheet::new(0, "Sheet1")],
                next_sheet_id: 1,
                calls: Vec::new(),
                fail_next: 0,
                append_column_offset: 0,
                modified: Utc::now(),
            }),
        }
    }

    /// Seed the first sheet with rows of cell text
    pub fn with_rows<R, S>(self, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock();
            let sheet = &mut state.sheets[0];
            sheet.cells = rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect();
        }
        self
    }

    /// Add a blank sheet with explicit id and dimensions
    pub fn with_sheet(self, sheet_id: i64, title: &str, row_count: u32, column_count: u32) -> Self {
        {
            let mut state = self.state.lock();
            let mut sheet = MemorySheet::new(sheet_id, title);
            sheet.row_count = row_count;
            sheet.column_count = column_count;
            state.sheets.push(sheet);
            state.next_sheet_id = state.next_sheet_id.max(sheet_id + 1);
        }
        self
    }

    /// Change the declared dimensions of a sheet
    pub fn resize(&self, sheet_id: i64, row_count: u32, column_count: u32) {
        let mut state = self.state.lock();
        if let Some(sheet) = state.sheets.iter_mut().find(|s| s.sheet_id == sheet_id) {
            sheet.row_count = row_count;
            sheet.column_count = column_count;
        }
    }

    /// Make the next `n` calls fail with a transport error
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// Start appended rows this many columns right of column A
    pub fn set_append_column_offset(&self, offset: u32) {
        self.state.lock().append_column_offset = offset;
    }

    /// Contents of a sheet, trailing empties removed
    pub fn rows(&self, sheet_id: i64) -> Vec<Vec<String>> {
        let state = self.state.lock();
        state
            .sheets
            .iter()
            .find(|s| s.sheet_id == sheet_id)
            .map(MemorySheet::trimmed)
            .unwrap_or_default()
    }

    /// Declared `(row_count, column_count)` of a sheet
    pub fn dimensions(&self, sheet_id: i64) -> Option<(u32, u32)> {
        let state = self.state.lock();
        state
            .sheets
            .iter()
            .find(|s| s.sheet_id == sheet_id)
            .map(|s| (s.row_count, s.column_count))
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<(Method, Value)> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received for one method
    pub fn call_count(&self, method: Method) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn call(&self, method: Method, params: Value) -> Result<Value> {
        let mut state = self.state.lock();
        state.calls.push((method, params.clone()));

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(GridStoreError::Transport(format!(
                "{}: injected failure",
                method
            )));
        }

        let result = match method {
            Method::SpreadsheetsGet => state.spreadsheet(&params),
            Method::ValuesGet => state.values_get(&params),
            Method::ValuesAppend => state.values_append(&params),
            Method::ValuesBatchUpdate => state.values_batch_update(&params),
            Method::BatchUpdate => state.batch_update(&params),
            Method::DriveFilesGet => Ok(state.file()),
        };
        if result.is_ok() && method.is_mutation() {
            state.modified = Utc::now();
        }
        result
    }
}

fn transport_error(message: impl Into<String>) -> GridStoreError {
    GridStoreError::Transport(message.into())
}

fn str_param<'a>(params: &'a Value, pointer: &str) -> Result<&'a str> {
    params
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| transport_error(format!("missing parameter {}", pointer)))
}

fn u64_param(params: &Value, pointer: &str) -> Result<u64> {
    params
        .pointer(pointer)
        .and_then(Value::as_u64)
        .ok_or_else(|| transport_error(format!("missing parameter {}", pointer)))
}

/// Cell text as the service would store it; `None` for `null` (skip)
fn written_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Number(n) => Some(n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())),
        other => Some(other.to_string()),
    }
}

fn value_rows(values: Option<&Value>) -> Vec<Vec<Option<String>>> {
    values
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(written_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

impl MemoryState {
    fn check_spreadsheet(&self, params: &Value) -> Result<()> {
        let id = str_param(params, "/spreadsheetId")?;
        if id != self.spreadsheet_id {
            return Err(transport_error(format!("Requested entity was not found: {}", id)));
        }
        Ok(())
    }

    fn sheet_by_title(&mut self, title: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.title == title)
            .ok_or_else(|| transport_error(format!("Unable to parse range: {}", title)))
    }

    fn sheet_by_id(&mut self, sheet_id: i64) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.sheet_id == sheet_id)
            .ok_or_else(|| transport_error(format!("No grid with id: {}", sheet_id)))
    }

    fn range(params: &Value, pointer: &str) -> Result<RangeRef> {
        let text = str_param(params, pointer)?;
        parse_a1_range(text)
            .ok_or_else(|| transport_error(format!("Unable to parse range: {}", text)))
    }

    fn spreadsheet(&self, params: &Value) -> Result<Value> {
        self.check_spreadsheet(params)?;
        let sheets: Vec<Value> = self
            .sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| {
                let row_data: Vec<Value> = sheet
                    .cells
                    .iter()
                    .map(|row| {
                        let values: Vec<Value> = row
                            .iter()
                            .map(|cell| {
                                if cell.is_empty() {
                                    json!({})
                                } else {
                                    json!({ "userEnteredValue": { "stringValue": cell } })
                                }
                            })
                            .collect();
                        json!({ "values": values })
                    })
                    .collect();
                json!({
                    "properties": sheet.properties(index),
                    "data": [{ "rowData": row_data }],
                })
            })
            .collect();

        Ok(json!({
            "spreadsheetId": self.spreadsheet_id,
            "properties": { "title": self.title },
            "sheets": sheets,
        }))
    }

    fn values_get(&mut self, params: &Value) -> Result<Value> {
        self.check_spreadsheet(params)?;
        let range = Self::range(params, "/range")?;
        let sheet = self.sheet_by_title(&range.title)?;

        let first = range.start_row.unwrap_or(1).max(1);
        let last = range.end_row.unwrap_or_else(|| sheet.last_row());
        let first_col = range.start_col;
        let last_col = range.end_col.unwrap_or(range.start_col);

        let mut rows: Vec<Vec<String>> = (first..=last)
            .map(|r| {
                trim_row(
                    (first_col..=last_col)
                        .map(|c| sheet.cell(r, c).to_string())
                        .collect(),
                )
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }

        let mut response = json!({ "range": range.to_string(), "majorDimension": "ROWS" });
        if !rows.is_empty() {
            response["values"] = json!(rows);
        }
        Ok(response)
    }

    fn values_append(&mut self, params: &Value) -> Result<Value> {
        self.check_spreadsheet(params)?;
        let range = Self::range(params, "/range")?;
        let rows = value_rows(params.pointer("/resource/values"));
        let insert_rows =
            params.get("insertDataOption").and_then(Value::as_str) == Some("INSERT_ROWS");
        let offset = self.append_column_offset;
        let spreadsheet_id = self.spreadsheet_id.clone();
        let sheet = self.sheet_by_title(&range.title)?;

        let start_row = sheet.last_row() + 1;
        let start_col = 1 + offset;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        let end_row = start_row + rows.len().max(1) as u32 - 1;
        let end_col = start_col + width - 1;

        if insert_rows {
            sheet.row_count += rows.len() as u32;
        }
        sheet.row_count = sheet.row_count.max(end_row);
        sheet.column_count = sheet.column_count.max(end_col);

        for (i, row) in rows.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if let Some(text) = cell {
                    sheet.set(start_row + i as u32, start_col + j as u32, text.clone());
                }
            }
        }

        let updated = format!(
            "'{}'!{}{}:{}{}",
            sheet.title.replace('\'', "''"),
            column_to_letter(start_col),
            start_row,
            column_to_letter(end_col),
            end_row
        );
        Ok(json!({
            "spreadsheetId": spreadsheet_id,
            "updates": {
                "spreadsheetId": spreadsheet_id,
                "updatedRange": updated,
                "updatedRows": rows.len(),
                "updatedColumns": width,
            }
        }))
    }

    fn values_batch_update(&mut self, params: &Value) -> Result<Value> {
        self.check_spreadsheet(params)?;
        let data = params
            .pointer("/resource/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Validate every range before writing any of them
        let mut writes = Vec::with_capacity(data.len());
        for entry in &data {
            let range = Self::range(entry, "/range")?;
            let rows = value_rows(entry.get("values"));
            let sheet = self.sheet_by_title(&range.title)?;
            let start_row = range.start_row.unwrap_or(1);
            for (i, row) in rows.iter().enumerate() {
                for (j, cell) in row.iter().enumerate() {
                    if cell.is_none() {
                        continue;
                    }
                    let (r, c) = (start_row + i as u32, range.start_col + j as u32);
                    if r > sheet.row_count || c > sheet.column_count {
                        return Err(transport_error(format!(
                            "Range ({}) exceeds grid limits. Max rows: {}, max columns: {}",
                            range, sheet.row_count, sheet.column_count
                        )));
                    }
                }
            }
            writes.push((range, start_row, rows));
        }

        let mut total_rows = 0;
        for (range, start_row, rows) in writes {
            let sheet = self.sheet_by_title(&range.title)?;
            for (i, row) in rows.iter().enumerate() {
                for (j, cell) in row.iter().enumerate() {
                    if let Some(text) = cell {
                        sheet.set(start_row + i as u32, range.start_col + j as u32, text.clone());
                    }
                }
            }
            total_rows += rows.len();
        }

        Ok(json!({
            "spreadsheetId": self.spreadsheet_id,
            "totalUpdatedRows": total_rows,
        }))
    }

    fn batch_update(&mut self, params: &Value) -> Result<Value> {
        self.check_spreadsheet(params)?;
        let requests = params
            .pointer("/resource/requests")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut replies = Vec::with_capacity(requests.len());
        for request in &requests {
            let reply = if let Some(r) = request.get("appendDimension") {
                self.append_dimension(r)?
            } else if let Some(r) = request.get("deleteDimension") {
                self.delete_dimension(r)?
            } else if let Some(r) = request.get("addSheet") {
                self.add_sheet(r)?
            } else if let Some(r) = request.get("deleteSheet") {
                self.delete_sheet(r)?
            } else {
                return Err(transport_error(format!("Invalid request: {}", request)));
            };
            replies.push(reply);
        }

        Ok(json!({
            "spreadsheetId": self.spreadsheet_id,
            "replies": replies,
        }))
    }

    fn append_dimension(&mut self, request: &Value) -> Result<Value> {
        let sheet_id = request.get("sheetId").and_then(Value::as_i64).unwrap_or(0);
        let length = u64_param(request, "/length")? as u32;
        let dimension = str_param(request, "/dimension")?.to_string();
        let sheet = self.sheet_by_id(sheet_id)?;
        match dimension.as_str() {
            "ROWS" => sheet.row_count += length,
            "COLUMNS" => sheet.column_count += length,
            other => return Err(transport_error(format!("Invalid dimension: {}", other))),
        }
        Ok(json!({}))
    }

    fn delete_dimension(&mut self, request: &Value) -> Result<Value> {
        let sheet_id = request
            .pointer("/range/sheetId")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let start = u64_param(request, "/range/startIndex")? as usize;
        let end = u64_param(request, "/range/endIndex")? as usize;
        let dimension = str_param(request, "/range/dimension")?.to_string();
        let sheet = self.sheet_by_id(sheet_id)?;
        if end <= start {
            return Err(transport_error("Invalid dimension range"));
        }
        let count = (end - start) as u32;

        match dimension.as_str() {
            "ROWS" => {
                if end as u32 > sheet.row_count {
                    return Err(transport_error("Deleted rows exceed grid limits"));
                }
                if start < sheet.cells.len() {
                    sheet.cells.drain(start..end.min(sheet.cells.len()));
                }
                sheet.row_count -= count;
            }
            "COLUMNS" => {
                if end as u32 > sheet.column_count {
                    return Err(transport_error("Deleted columns exceed grid limits"));
                }
                for row in sheet.cells.iter_mut() {
                    if start < row.len() {
                        row.drain(start..end.min(row.len()));
                    }
                }
                sheet.column_count -= count;
            }
            other => return Err(transport_error(format!("Invalid dimension: {}", other))),
        }
        Ok(json!({}))
    }

    fn add_sheet(&mut self, request: &Value) -> Result<Value> {
        let title = str_param(request, "/properties/title")?.to_string();
        if self.sheets.iter().any(|s| s.title == title) {
            return Err(transport_error(format!(
                "A sheet with the name \"{}\" already exists",
                title
            )));
        }
        let sheet = MemorySheet::new(self.next_sheet_id, &title);
        self.next_sheet_id += 1;
        let properties = sheet.properties(self.sheets.len());
        self.sheets.push(sheet);
        Ok(json!({ "addSheet": { "properties": properties } }))
    }

    fn delete_sheet(&mut self, request: &Value) -> Result<Value> {
        let sheet_id = request
            .get("sheetId")
            .and_then(Value::as_i64)
            .ok_or_else(|| transport_error("missing sheetId"))?;
        let position = self
            .sheets
            .iter()
            .position(|s| s.sheet_id == sheet_id)
            .ok_or_else(|| transport_error(format!("No grid with id: {}", sheet_id)))?;
        self.sheets.remove(position);
        Ok(json!({}))
    }

    fn file(&self) -> Value {
        json!({
            "id": self.spreadsheet_id,
            "name": self.title,
            "modifiedTime": self.modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_get_trims_trailing_empties() {
        let transport = MemoryTransport::new("s")
            .with_rows(vec![vec!["a", "b", ""], vec!["", "", ""], vec!["c"]]);
        let response = transport
            .call(
                Method::ValuesGet,
                json!({ "spreadsheetId": "s", "range": "'Sheet1'!A1:ZZ" }),
            )
            .await
            .unwrap();
        assert_eq!(response["values"], json!([["a", "b"], [], ["c"]]));
    }

    #[tokio::test]
    async fn test_append_reports_range() {
        let transport = MemoryTransport::new("s").with_rows(vec![vec!["h1", "h2"]]);
        transport.set_append_column_offset(2);
        let response = transport
            .call(
                Method::ValuesAppend,
                json!({
                    "spreadsheetId": "s",
                    "range": "'Sheet1'!A1",
                    "resource": { "values": [["x", "y"], ["z"]] },
                }),
            )
            .await
            .unwrap();
        assert_eq!(response["updates"]["updatedRange"], "'Sheet1'!C2:D3");
        assert_eq!(transport.rows(0)[1], vec!["", "", "x", "y"]);
    }

    #[tokio::test]
    async fn test_batch_update_rejects_out_of_bounds() {
        let transport = MemoryTransport::new("s");
        transport.resize(0, 2, 2);
        let err = transport
            .call(
                Method::ValuesBatchUpdate,
                json!({
                    "spreadsheetId": "s",
                    "resource": { "data": [{ "range": "'Sheet1'!A3:ZZ3", "values": [["x"]] }] },
                }),
            )
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(transport.rows(0).is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let transport = MemoryTransport::new("s");
        transport.fail_next(1);
        let params = json!({ "spreadsheetId": "s" });
        assert!(transport.call(Method::SpreadsheetsGet, params.clone()).await.is_err());
        assert!(transport.call(Method::SpreadsheetsGet, params).await.is_ok());
        assert_eq!(transport.call_count(Method::SpreadsheetsGet), 2);
    }

    #[tokio::test]
    async fn test_unknown_spreadsheet() {
        let transport = MemoryTransport::new("s");
        let err = transport
            .call(Method::SpreadsheetsGet, json!({ "spreadsheetId": "other" }))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
