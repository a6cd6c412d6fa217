//! Column letters and A1 range notation
//!
//! Columns and rows are 1-based throughout. Column letters use bijective
//! base-26: there is no zero digit, so `Z` is 26 and `AA` is 27.

use gridstore_common::{GridStoreError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Right-most column addressed by whole-row writes (`ZZ`)
pub const LAST_COLUMN: u32 = 702;

/// Highest column a sheet can have (`ZZZ`)
pub const MAX_COLUMN: u32 = 18_278;

/// Convert a 1-based column index to its letter form (1 -> `A`, 27 -> `AA`).
///
/// Index 0 has no letter form and yields an empty string.
pub fn column_to_letter(index: u32) -> String {
    let mut column = index;
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert a column letter sequence to its 1-based index (`AA` -> 27).
///
/// Case-insensitive. Returns `None` for empty input, non-letters, or values
/// that overflow `u32`.
pub fn column_letter_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A reference to a column, either by letter or by 1-based index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnRef {
    Letter(String),
    Index(u32),
}

impl ColumnRef {
    /// Resolve to a 1-based column index no greater than `MAX_COLUMN`
    pub fn index(&self) -> Result<u32> {
        let index = match self {
            ColumnRef::Index(0) => {
                return Err(GridStoreError::InvalidArgument(
                    "Column index must be 1-based".to_string(),
                ))
            }
            ColumnRef::Index(i) => *i,
            ColumnRef::Letter(letters) => column_letter_to_index(letters).ok_or_else(|| {
                GridStoreError::InvalidArgument(format!("Invalid column letter: '{}'", letters))
            })?,
        };
        if index > MAX_COLUMN {
            return Err(GridStoreError::InvalidArgument(format!(
                "Column {} is past the last column {} ({})",
                self,
                column_to_letter(MAX_COLUMN),
                MAX_COLUMN
            )));
        }
        Ok(index)
    }
}

impl FromStr for ColumnRef {
    type Err = GridStoreError;

    /// Parse `"C"` as a letter reference and `"3"` as an index reference
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let index = s.parse().map_err(|_| {
                GridStoreError::InvalidArgument(format!("Invalid column index: '{}'", s))
            })?;
            return Ok(ColumnRef::Index(index));
        }
        if column_letter_to_index(s).is_some() {
            return Ok(ColumnRef::Letter(s.to_ascii_uppercase()));
        }
        Err(GridStoreError::InvalidArgument(format!(
            "Invalid column reference: '{}'",
            s
        )))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Letter(letters) => f.write_str(letters),
            ColumnRef::Index(index) => write!(f, "#{}", index),
        }
    }
}

impl From<u32> for ColumnRef {
    fn from(index: u32) -> Self {
        ColumnRef::Index(index)
    }
}

/// Cell values for one row to be written
#[derive(Debug, Clone, PartialEq)]
pub enum RowData {
    /// Positional values starting at column A; `None` leaves a cell untouched
    Values(Vec<Option<String>>),
    /// Values keyed by column
    Sparse(BTreeMap<ColumnRef, String>),
}

impl RowData {
    /// Positional row from plain strings
    pub fn values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RowData::Values(values.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Sparse row from `(column, value)` pairs
    pub fn sparse<I, C, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = (C, S)>,
        C: Into<ColumnRef>,
        S: Into<String>,
    {
        RowData::Sparse(
            cells
                .into_iter()
                .map(|(c, v)| (c.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| ColumnRef::Letter(s.to_ascii_uppercase()))
    }
}

/// Convert a row to its dense positional form.
///
/// Positional rows pass through unchanged. Sparse rows are laid out by
/// column index, leaving unset positions as `None`.
pub fn data_to_value(data: &RowData) -> Result<Vec<Option<String>>> {
    match data {
        RowData::Values(values) => Ok(values.clone()),
        RowData::Sparse(cells) => {
            let mut row: Vec<Option<String>> = Vec::new();
            for (column, value) in cells {
                let index = column.index()? as usize;
                if row.len() < index {
                    row.resize(index, None);
                }
                row[index - 1] = Some(value.clone());
            }
            Ok(row)
        }
    }
}

/// A rectangular range on one sheet.
///
/// Missing bounds make the range open: `'Data'!A2:ZZ` runs to the last row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub title: String,
    pub start_col: u32,
    pub start_row: Option<u32>,
    pub end_col: Option<u32>,
    pub end_row: Option<u32>,
}

impl RangeRef {
    /// Single cell range
    pub fn cell(title: impl Into<String>, col: u32, row: u32) -> Self {
        Self {
            title: title.into(),
            start_col: col,
            start_row: Some(row),
            end_col: None,
            end_row: None,
        }
    }

    /// Whole row range (`A<row>:ZZ<row>`)
    pub fn row(title: impl Into<String>, row: u32) -> Self {
        Self::cell(title, 1, row).to(LAST_COLUMN, Some(row))
    }

    /// Set the lower-right corner
    pub fn to(mut self, col: u32, row: Option<u32>) -> Self {
        self.end_col = Some(col);
        self.end_row = row;
        self
    }
}

fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_title(&self.title), column_to_letter(self.start_col))?;
        if let Some(row) = self.start_row {
            write!(f, "{}", row)?;
        }
        if let Some(col) = self.end_col {
            write!(f, ":{}", column_to_letter(col))?;
            if let Some(row) = self.end_row {
                write!(f, "{}", row)?;
            }
        }
        Ok(())
    }
}

/// Format `'<title>'!<col><row>:<col><row>`
pub fn a1_range(title: &str, start_col: u32, start_row: u32, end_col: u32, end_row: u32) -> String {
    RangeRef::cell(title, start_col, start_row)
        .to(end_col, Some(end_row))
        .to_string()
}

/// Parse A1 range notation as reported by the service.
///
/// Accepts quoted (`'My Sheet'!C5:E7`) and bare (`Sheet1!A1`) titles and
/// open-ended ranges. Returns `None` when the text is not a range.
pub fn parse_a1_range(range: &str) -> Option<RangeRef> {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = RANGE_RE.get_or_init(|| {
        Regex::new(r"^(?:'((?:[^']|'')*)'|([^'!]+))!([A-Za-z]+)(\d+)?(?::([A-Za-z]+)(\d+)?)?$")
            .expect("valid regex")
    });

    let caps = re.captures(range.trim())?;
    let title = match (caps.get(1), caps.get(2)) {
        (Some(quoted), _) => quoted.as_str().replace("''", "'"),
        (None, Some(bare)) => bare.as_str().to_string(),
        _ => return None,
    };
    let start_col = column_letter_to_index(caps.get(3)?.as_str())?;
    let start_row = caps.get(4).and_then(|m| m.as_str().parse().ok());
    let end_col = caps.get(5).and_then(|m| column_letter_to_index(m.as_str()));
    let end_row = caps.get(6).and_then(|m| m.as_str().parse().ok());

    Some(RangeRef {
        title,
        start_col,
        start_row,
        end_col,
        end_row,
    })
}
