//! Row <-> document projection

use crate::document::Document;
use crate::header::Header;
use gridstore_common::{GridStoreError, Result};
use gridstore_grid::column_to_letter;

/// How rows are turned into documents
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Row number of the first row when the slice has no header row
    /// (rows just appended); requires `header`
    pub offset: Option<u32>,
    /// Header to use when the slice does not start with one
    pub header: Option<Header>,
    /// Lowercase header names before keying documents
    pub lowercase_header: bool,
    /// Key documents by column letter (`A`, `B`, ...) instead of header name
    pub column_letters: bool,
}

/// Convert rows to documents.
///
/// Without an offset the first row is the header (row 1) and is never
/// emitted; documents are numbered by position. With an offset every row is
/// data and numbering starts at the offset. Rows whose cells are all empty
/// are skipped, and every emitted document carries every header field
/// (empty string when the cell is empty).
pub fn values_to_data(
    rows: &[Vec<String>],
    options: &Projection,
) -> Result<(Header, Vec<Document>)> {
    let (header, data, first_row) = match options.offset {
        Some(offset) => {
            let header = options.header.clone().ok_or_else(|| {
                GridStoreError::InvalidArgument("offset projection needs a header".to_string())
            })?;
            (header, rows, offset)
        }
        None => {
            let header = options
                .header
                .clone()
                .or_else(|| rows.first().map(|r| Header::new(r.iter().cloned())))
                .unwrap_or_default();
            (header, rows.get(1..).unwrap_or(&[]), 2)
        }
    };
    let header = if options.lowercase_header {
        header.lowercased()
    } else {
        header
    };

    let documents = data
        .iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|cell| !cell.is_empty()))
        .map(|(i, row)| {
            let mut doc = Document::new(first_row + i as u32);
            if options.column_letters {
                let width = header.len().max(row.len());
                for col in 0..width {
                    let value = row.get(col).cloned().unwrap_or_default();
                    doc.insert(column_to_letter(col as u32 + 1), value);
                }
            } else {
                for (col, name) in header.columns().iter().enumerate() {
                    if name.is_empty() {
                        continue;
                    }
                    let value = row.get(col).cloned().unwrap_or_default();
                    doc.insert(name.clone(), value);
                }
            }
            doc
        })
        .collect();

    Ok((header, documents))
}
