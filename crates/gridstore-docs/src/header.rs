//! Header row registry

use gridstore_grid::RowData;

/// Ordered column names taken from row 1 of a sheet.
///
/// An empty name marks an unnamed column: it keeps its position but is
/// never projected into documents or matched by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// 0-based position of a named column
    pub fn position(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.columns.iter().position(|c| c == name)
    }

    /// Position of `name`, appending it when absent.
    ///
    /// Returns the 0-based position and whether the column was added.
    pub fn find_or_append(&mut self, name: &str) -> (usize, bool) {
        match self.position(name) {
            Some(position) => (position, false),
            None => {
                self.columns.push(name.to_string());
                (self.columns.len() - 1, true)
            }
        }
    }

    /// Copy with every name lowercased
    pub fn lowercased(&self) -> Header {
        Header::new(self.columns.iter().map(|c| c.to_lowercase()))
    }

    /// The header as a full positional row
    pub fn to_row(&self) -> RowData {
        RowData::values(self.columns.iter().cloned())
    }
}
