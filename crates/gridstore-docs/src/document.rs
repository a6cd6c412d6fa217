//! Documents projected from sheet rows

use crate::header::Header;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::ops::Deref;

/// Reserved field carrying a document's 1-based row number
pub const ROW_FIELD: &str = "_row";

/// One data row keyed by header name.
///
/// Fields keep the order they were inserted in, which is header order for
/// projected rows. Values are always JSON strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub row: u32,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            fields: Map::new(),
        }
    }

    /// Set a field, keeping its position when it already exists
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), Value::String(value.into()));
    }

    /// Field value; `_row` yields the row number and missing fields are empty
    pub fn value(&self, field: &str) -> Cow<'_, str> {
        if field == ROW_FIELD {
            return Cow::Owned(self.row.to_string());
        }
        Cow::Borrowed(self.get(field).unwrap_or(""))
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// `{"_row": n, field: value, ...}`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(ROW_FIELD.to_string(), Value::from(self.row));
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

/// Text form of a JSON scalar as it is stored in a cell
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// A result sequence, optionally carrying the header it was built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    docs: Vec<Document>,
    header: Option<Header>,
}

impl Documents {
    pub fn new(docs: Vec<Document>, header: Option<Header>) -> Self {
        Self { docs, header }
    }

    /// The header snapshot, when requested at read time
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn into_vec(self) -> Vec<Document> {
        self.docs
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.docs.iter().map(Document::to_json).collect())
    }
}

impl Deref for Documents {
    type Target = [Document];

    fn deref(&self) -> &Self::Target {
        &self.docs
    }
}

impl IntoIterator for Documents {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}
