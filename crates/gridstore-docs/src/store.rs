//! Collections over the sheets of one spreadsheet

use crate::document::{scalar_text, Document, Documents, ROW_FIELD};
use crate::header::Header;
use crate::projection::{values_to_data, Projection};
use crate::query::Query;
use crate::sort::Sort;
use crate::update::Patch;
use gridstore_common::{GridStoreConfig, GridStoreError, Result};
use gridstore_grid::{
    ColumnRef, GridAdapter, ListOptions, RowData, RowUpdate, SheetProperties, SheetSelector,
    Transport,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Document store over one spreadsheet resource.
///
/// Every collection obtained from the same store shares one grid adapter,
/// and with it one snapshot cache.
#[derive(Clone)]
pub struct SheetStore {
    grid: Arc<GridAdapter>,
}

impl SheetStore {
    pub fn new(transport: Arc<dyn Transport>, config: &GridStoreConfig) -> Self {
        Self::from_adapter(Arc::new(GridAdapter::new(transport, config)))
    }

    pub fn from_adapter(grid: Arc<GridAdapter>) -> Self {
        Self { grid }
    }

    /// The underlying grid adapter
    pub fn grid(&self) -> &Arc<GridAdapter> {
        &self.grid
    }

    /// Collection bound to one sheet
    pub fn collection(&self, sheet: impl Into<SheetSelector>) -> Collection {
        Collection {
            grid: self.grid.clone(),
            sheet: Some(sheet.into()),
        }
    }

    /// Collection bound to the configured default sheet (or sheet id 0)
    pub fn default_collection(&self) -> Collection {
        Collection {
            grid: self.grid.clone(),
            sheet: None,
        }
    }

    /// Create a sheet and return a collection bound to it
    pub async fn add_sheet(&self, title: &str) -> Result<Collection> {
        let properties: SheetProperties = self.grid.add_sheet(title).await?;
        Ok(self.collection(properties.sheet_id))
    }

    pub async fn drop_sheet(&self, sheet: impl Into<SheetSelector>) -> Result<()> {
        self.grid.delete_sheet(&sheet.into()).await
    }
}

/// Read options for `Collection::find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Attach the header used for projection to the result
    pub header: bool,
    /// Matches to drop after sorting
    pub skip: usize,
    /// Maximum number of matches returned
    pub limit: Option<usize>,
    pub sort: Option<Sort>,
    /// Lowercase header names before keying documents
    pub lowercase_header: bool,
    /// Key documents by column letter instead of header name
    pub column_letters: bool,
    /// Read the sheet directly instead of through the snapshot cache
    pub fresh: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn lowercase_header(mut self, lowercase: bool) -> Self {
        self.lowercase_header = lowercase;
        self
    }

    pub fn column_letters(mut self, column_letters: bool) -> Self {
        self.column_letters = column_letters;
        self
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }
}

/// One sheet viewed as a document collection
#[derive(Clone)]
pub struct Collection {
    grid: Arc<GridAdapter>,
    sheet: Option<SheetSelector>,
}

impl Collection {
    /// The sheet this collection is bound to (`None` is the default sheet)
    pub fn sheet(&self) -> Option<&SheetSelector> {
        self.sheet.as_ref()
    }

    /// Row 1 of the sheet, read directly; empty when the sheet is blank
    pub async fn get_header(&self) -> Result<Header> {
        let rows = self
            .grid
            .list(
                &ListOptions::new()
                    .sheet(self.sheet.clone())
                    .start(1)
                    .limit(1)
                    .fresh(true),
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(Header::new)
            .unwrap_or_default())
    }

    /// Rewrite row 1 with the given header
    pub async fn update_header(&self, header: &Header) -> Result<()> {
        debug!(sheet = ?self.sheet, columns = header.len(), "writing header");
        self.grid
            .update(
                &[RowUpdate::new(1, header.to_row())],
                self.sheet.as_ref(),
                true,
            )
            .await?;
        Ok(())
    }

    /// Insert one document
    pub async fn insert_one(&self, document: &Value) -> Result<Documents> {
        self.insert(std::slice::from_ref(document)).await
    }

    /// Insert documents, extending the header with any unknown fields.
    ///
    /// An extended header is written before the data is appended; the two
    /// writes are separate requests. Returns the inserted documents with
    /// their row numbers.
    pub async fn insert(&self, documents: &[Value]) -> Result<Documents> {
        if documents.is_empty() {
            return Ok(Documents::default());
        }

        let mut header = self.get_header().await?;
        let mut added = Vec::new();
        let mut rows = Vec::with_capacity(documents.len());

        for document in documents {
            let fields = document.as_object().ok_or_else(|| {
                GridStoreError::InvalidArgument(format!(
                    "documents must be objects, got {}",
                    document
                ))
            })?;

            let mut row: Vec<(usize, String)> = Vec::with_capacity(fields.len());
            for (field, value) in fields {
                if field.is_empty() || field == ROW_FIELD {
                    continue;
                }
                let (position, is_new) = header.find_or_append(field);
                if is_new {
                    added.push(field.clone());
                }
                row.push((position, scalar_text(value)));
            }
            rows.push(row);
        }

        if !added.is_empty() {
            info!(sheet = ?self.sheet, columns = ?added, "extending header");
            self.update_header(&header).await?;
        }

        let values: Vec<Vec<String>> = rows
            .into_iter()
            .map(|cells| {
                let mut row = vec![String::new(); header.len()];
                for (position, text) in cells {
                    row[position] = text;
                }
                row
            })
            .collect();
        let data: Vec<RowData> = values
            .iter()
            .map(|r| RowData::values(r.iter().cloned()))
            .collect();

        let appended = self.grid.append(&data, self.sheet.as_ref()).await?;
        let (header, docs) = values_to_data(
            &values,
            &Projection {
                offset: Some(appended.start_row),
                header: Some(header),
                ..Projection::default()
            },
        )?;

        info!(
            sheet = ?self.sheet,
            inserted = docs.len(),
            start_row = appended.start_row,
            "documents inserted"
        );
        Ok(Documents::new(docs, Some(header)))
    }

    /// Matching documents: filter, then sort, then skip/limit
    pub async fn find(&self, query: &Query, options: &FindOptions) -> Result<Documents> {
        let rows = self
            .grid
            .list(
                &ListOptions::new()
                    .sheet(self.sheet.clone())
                    .fresh(options.fresh),
            )
            .await?;

        let (header, docs) = values_to_data(
            &rows,
            &Projection {
                offset: None,
                header: None,
                lowercase_header: options.lowercase_header,
                column_letters: options.column_letters,
            },
        )?;

        let mut matched: Vec<_> = docs.into_iter().filter(|d| query.matches(d)).collect();
        if let Some(sort) = &options.sort {
            sort.apply(&mut matched);
        }
        let matched: Vec<_> = matched
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        debug!(sheet = ?self.sheet, rows = rows.len(), matched = matched.len(), "find");
        Ok(Documents::new(matched, options.header.then_some(header)))
    }

    /// The first match under the given options, if any
    pub async fn find_one(
        &self,
        query: &Query,
        options: &FindOptions,
    ) -> Result<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self.find(query, &options).await?.into_vec().pop())
    }

    /// Apply a patch to every matching document in one batched write.
    ///
    /// Fields missing from the header are appended to it first. Returns the
    /// number of rows written.
    pub async fn update(&self, query: &Query, patch: &Patch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }

        let found = self.find(query, &FindOptions::new().header(true)).await?;
        if found.is_empty() {
            return Ok(0);
        }

        let mut header = found.header().cloned().unwrap_or_default();
        let mut extended = false;
        let targets: Vec<u32> = patch
            .fields()
            .iter()
            .map(|p| {
                let (position, is_new) = header.find_or_append(&p.field);
                extended |= is_new;
                position as u32 + 1
            })
            .collect();
        if extended {
            info!(sheet = ?self.sheet, "extending header for update");
            self.update_header(&header).await?;
        }

        let mut seen = BTreeSet::new();
        let updates: Vec<RowUpdate> = found
            .iter()
            .filter(|doc| seen.insert(doc.row))
            .map(|doc| {
                let cells = patch
                    .fields()
                    .iter()
                    .zip(&targets)
                    .map(|(p, &column)| (ColumnRef::Index(column), p.apply(&doc.value(&p.field))));
                RowUpdate::new(doc.row, RowData::sparse(cells))
            })
            .collect();

        let written = self
            .grid
            .update(&updates, self.sheet.as_ref(), true)
            .await?;
        info!(sheet = ?self.sheet, rows = written, "documents updated");
        Ok(written)
    }

    /// Delete every matching document; an empty query is refused
    pub async fn delete(&self, query: Option<&Query>) -> Result<usize> {
        let query = match query {
            Some(query) if !query.is_empty() => query,
            _ => {
                return Err(GridStoreError::InvalidArgument(
                    "delete requires a non-empty query".to_string(),
                ))
            }
        };

        let found = self.find(query, &FindOptions::new()).await?;
        let rows: Vec<u32> = found.iter().map(|d| d.row).collect();
        if rows.is_empty() {
            return Ok(0);
        }

        let deleted = self.grid.delete(&rows, &[], self.sheet.as_ref()).await?;
        info!(sheet = ?self.sheet, rows = deleted.rows, "documents deleted");
        Ok(deleted.rows)
    }
}
