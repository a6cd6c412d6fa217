//! Grid adapter for gridstore
//!
//! Presents row/column addressed CRUD over one remote spreadsheet resource.
//!
//! # Architecture
//! - `transport`: the single `call(method, params)` boundary to the service
//! - `address`: column letters and A1 range notation
//! - `snapshot`: the full-grid read model
//! - `cache`: the read-through snapshot cache
//! - `adapter`: `GridAdapter`, the row-range primitives
//! - `http` / `memory`: a REST transport and an in-process one

pub mod adapter;
pub mod address;
pub mod cache;
pub mod http;
pub mod memory;
pub mod snapshot;
pub mod transport;

pub use adapter::{
    AppendResult, DeleteResult, FileMetadata, GridAdapter, ListOptions, RowUpdate, SheetSelector,
};
pub use address::{
    a1_range, column_letter_to_index, column_to_letter, data_to_value, parse_a1_range, ColumnRef,
    RangeRef, RowData, LAST_COLUMN, MAX_COLUMN,
};
pub use cache::SnapshotCache;
pub use gridstore_common::{GridStoreError, Result};
pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use snapshot::{SheetProperties, SheetSnapshot, Snapshot};
pub use transport::{Method, Transport};
