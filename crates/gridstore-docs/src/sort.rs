//! Multi-key document ordering

use crate::document::Document;
use gridstore_common::{GridStoreError, Result};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;

static INTEGER_RE: OnceLock<Regex> = OnceLock::new();

fn integer_re() -> &'static Regex {
    INTEGER_RE.get_or_init(|| Regex::new(r"^-?\d+$").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Compare two cell values.
///
/// When both sides are integers they compare numerically; otherwise they
/// compare as text, case-insensitively first, then by exact bytes.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    let re = integer_re();
    if re.is_match(a) && re.is_match(b) {
        if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
            return x.cmp(&y);
        }
    }
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Ordered sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, Direction)>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), Direction::Ascending));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), Direction::Descending));
        self
    }

    /// Parse `{"field": 1, "other": -1}`; negative weights sort descending
    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            GridStoreError::InvalidArgument(format!("sort must be an object, got {}", value))
        })?;

        let mut sort = Self::new();
        for (field, weight) in fields {
            let weight = weight.as_f64().ok_or_else(|| {
                GridStoreError::InvalidArgument(format!(
                    "sort weight for '{}' must be a number",
                    field
                ))
            })?;
            sort = if weight < 0.0 {
                sort.desc(field.as_str())
            } else {
                sort.asc(field.as_str())
            };
        }
        Ok(sort)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[(String, Direction)] {
        &self.keys
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, direction) in &self.keys {
            let ordering = compare_values(&a.value(field), &b.value(field));
            let ordering = match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort; ties keep their row order
    pub fn apply(&self, docs: &mut [Document]) {
        if self.is_empty() {
            return;
        }
        docs.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(field: &str, values: &[&str]) -> Vec<Document> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut doc = Document::new(i as u32 + 2);
                doc.insert(field.to_string(), v.to_string());
                doc
            })
            .collect()
    }

    fn values(docs: &[Document], field: &str) -> Vec<String> {
        docs.iter().map(|d| d.value(field).into_owned()).collect()
    }

    #[test]
    fn test_numeric_inference() {
        let mut list = docs("n", &["10", "2", "9"]);
        Sort::new().asc("n").apply(&mut list);
        assert_eq!(values(&list, "n"), ["2", "9", "10"]);

        Sort::new().desc("n").apply(&mut list);
        assert_eq!(values(&list, "n"), ["10", "9", "2"]);
    }

    #[test]
    fn test_mixed_values_compare_as_text() {
        let mut list = docs("n", &["a", "10"]);
        Sort::new().asc("n").apply(&mut list);
        assert_eq!(values(&list, "n"), ["10", "a"]);

        assert_eq!(compare_values("-3", "2"), Ordering::Less);
        assert_eq!(compare_values("Bob", "alice"), Ordering::Greater);
        assert_eq!(compare_values("abc", "ABC"), Ordering::Greater);
    }

    #[test]
    fn test_multiple_keys_and_stability() {
        let mut list = vec![
            Document::new(2),
            Document::new(3),
            Document::new(4),
        ];
        for (doc, (city, name)) in list
            .iter_mut()
            .zip([("oslo", "b"), ("bergen", "z"), ("oslo", "a")])
        {
            doc.insert("city", city);
            doc.insert("name", name);
        }

        Sort::from_json(&json!({ "city": -1, "name": 1 }))
            .unwrap()
            .apply(&mut list);
        let rows: Vec<u32> = list.iter().map(|d| d.row).collect();
        assert_eq!(rows, vec![4, 2, 3]);

        let mut ties = docs("k", &["x", "x", "x"]);
        Sort::new().asc("k").apply(&mut ties);
        let rows: Vec<u32> = ties.iter().map(|d| d.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
    }

    #[test]
    fn test_invalid_sort() {
        assert!(Sort::from_json(&json!(["a"])).is_err());
        assert!(Sort::from_json(&json!({ "a": "up" })).is_err());
    }
}
