//! Full-grid snapshot of a spreadsheet resource
//!
//! Built from a `spreadsheets.get` response with grid data:
//! `sheets[].properties` carries identity and dimensions, and
//! `sheets[].data[0].rowData[].values[]` carries the cells.

use gridstore_common::{GridStoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity and dimensions of one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    /// Position among sibling sheets
    pub index: u32,
    pub row_count: u32,
    pub column_count: u32,
}

/// One sheet with its pre-parsed cell grid
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSnapshot {
    pub properties: SheetProperties,
    /// Display text per cell, row-major; absent cells are empty strings
    pub rows: Vec<Vec<String>>,
}

/// Every sheet of one spreadsheet resource
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheets: Vec<SheetSnapshot>,
}

impl Snapshot {
    /// Parse a `spreadsheets.get` response
    pub fn from_response(response: Value) -> Result<Self> {
        let raw: RawSpreadsheet = serde_json::from_value(response)
            .map_err(|e| GridStoreError::Deserialization(format!("spreadsheet: {}", e)))?;

        let sheets = raw
            .sheets
            .into_iter()
            .map(SheetSnapshot::from_raw)
            .collect();

        Ok(Self {
            spreadsheet_id: raw.spreadsheet_id,
            title: raw.properties.title,
            sheets,
        })
    }

    /// Position of the sheet with this numeric id
    pub fn position_by_id(&self, sheet_id: i64) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.properties.sheet_id == sheet_id)
    }

    /// Position of the sheet with this exact title
    pub fn position_by_title(&self, title: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.properties.title == title)
    }

    /// Find a sheet by numeric id
    pub fn by_id(&self, sheet_id: i64) -> Option<&SheetSnapshot> {
        self.position_by_id(sheet_id).map(|i| &self.sheets[i])
    }

    /// Find a sheet by exact title
    pub fn by_title(&self, title: &str) -> Option<&SheetSnapshot> {
        self.position_by_title(title).map(|i| &self.sheets[i])
    }
}

impl SheetSnapshot {
    fn from_raw(raw: RawSheet) -> Self {
        let rows = raw
            .data
            .into_iter()
            .next()
            .map(|grid| {
                grid.row_data
                    .into_iter()
                    .map(|row| row.values.iter().map(CellData::display).collect())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            properties: raw.properties.into(),
            rows,
        }
    }

    /// Rows `[start, start + limit - 1]` (1-based); `None` means to the end
    pub fn slice(&self, start: u32, limit: Option<usize>) -> Vec<Vec<String>> {
        let skip = start.saturating_sub(1) as usize;
        let take = limit.unwrap_or(usize::MAX);
        self.rows.iter().skip(skip).take(take).cloned().collect()
    }
}

/// Render a number the way the grid displays integral values
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpreadsheet {
    #[serde(default)]
    spreadsheet_id: String,
    #[serde(default)]
    properties: RawSpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<RawSheet>,
}

#[derive(Deserialize, Default)]
struct RawSpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct RawSheet {
    properties: RawSheetProperties,
    #[serde(default)]
    data: Vec<RawGridData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    grid_properties: RawGridProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawGridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

impl From<RawSheetProperties> for SheetProperties {
    fn from(raw: RawSheetProperties) -> Self {
        Self {
            sheet_id: raw.sheet_id,
            title: raw.title,
            index: raw.index,
            row_count: raw.grid_properties.row_count,
            column_count: raw.grid_properties.column_count,
        }
    }
}

/// Parse a bare `properties` object, as returned in an `addSheet` reply
pub(crate) fn parse_sheet_properties(value: Value) -> Result<SheetProperties> {
    let raw: RawSheetProperties = serde_json::from_value(value)
        .map_err(|e| GridStoreError::Deserialization(format!("sheet properties: {}", e)))?;
    Ok(raw.into())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGridData {
    #[serde(default)]
    row_data: Vec<RawRowData>,
}

#[derive(Deserialize)]
struct RawRowData {
    #[serde(default)]
    values: Vec<CellData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellData {
    user_entered_value: Option<ExtendedValue>,
    formatted_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtendedValue {
    string_value: Option<String>,
    number_value: Option<f64>,
    bool_value: Option<bool>,
    formula_value: Option<String>,
    error_value: Option<ErrorValue>,
}

#[derive(Deserialize)]
struct ErrorValue {
    #[serde(default)]
    message: String,
}

impl CellData {
    fn display(&self) -> String {
        if let Some(text) = &self.formatted_value {
            return text.clone();
        }
        let Some(value) = &self.user_entered_value else {
            return String::new();
        };
        if let Some(s) = &value.string_value {
            s.clone()
        } else if let Some(n) = value.number_value {
            format_number(n)
        } else if let Some(b) = value.bool_value {
            let text = if b { "TRUE" } else { "FALSE" };
            text.to_string()
        } else if let Some(f) = &value.formula_value {
            f.clone()
        } else if let Some(e) = &value.error_value {
            e.message.clone()
        } else {
            String::new()
        }
    }
}
