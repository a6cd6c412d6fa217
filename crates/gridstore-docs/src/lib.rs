//! Document engine for gridstore
//!
//! Treats each sheet of a spreadsheet as a schemaless collection: row 1 is
//! the header (the implicit schema), every following non-empty row is a
//! document keyed by header name, plus a `_row` field with its position.
//!
//! # Features
//! - Insert with automatic header extension
//! - Find with equality, wildcard, comparison, containment, emptiness and
//!   custom predicate terms
//! - Multi-key sort with numeric/lexicographic inference
//! - Update operators: `$inc`, `$append`, `$prepend`, `$lowercase`,
//!   `$uppercase`, `$replace`
//!
//! # Example
//!
//! ```rust,ignore
//! use gridstore_docs::{FindOptions, Query, SheetStore, Sort};
//! use serde_json::json;
//!
//! let store = SheetStore::new(transport, &config);
//! let people = store.collection("People");
//!
//! people.insert(&[json!({ "name": "ann", "age": 31 })]).await?;
//! let adults = people
//!     .find(&Query::new().gte("age", 18.0), &FindOptions::new().sort(Sort::new().asc("name")))
//!     .await?;
//! ```

pub mod document;
pub mod header;
pub mod projection;
pub mod query;
pub mod sort;
pub mod store;
pub mod update;

pub use document::{Document, Documents, ROW_FIELD};
pub use gridstore_common::{GridStoreError, Result};
pub use header::Header;
pub use projection::{values_to_data, Projection};
pub use query::{CompareOp, Condition, Query};
pub use sort::{compare_values, Direction, Sort};
pub use store::{Collection, FindOptions, SheetStore};
pub use update::{FieldPatch, Patch, Replacer, UpdateOp};
