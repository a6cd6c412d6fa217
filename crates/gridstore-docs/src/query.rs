//! Query terms and filter compilation
//!
//! A query is a list of `(field, condition)` terms, all of which must hold.
//! From JSON:
//!
//! ```text
//! { "name": "ca*" }                  wildcard (anchored at both ends)
//! { "city": "Oslo" }                 exact equality
//! { "age": { "$gte": 18 } }          numeric comparison ($gt $lt $gte $lte)
//! { "tags": { "$contains": "vip" } } substring containment
//! { "email": { "$empty": true } }    emptiness check
//! ```

use crate::document::{scalar_text, Document};
use gridstore_common::{GridStoreError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Gt => left > right,
            CompareOp::Lt => left < right,
            CompareOp::Gte => left >= right,
            CompareOp::Lte => left <= right,
        }
    }
}

type PredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One compiled predicate over a single field value
#[derive(Clone)]
pub enum Condition {
    /// Exact string equality
    Eq(String),
    /// Compiled `*` pattern
    Wildcard(Regex),
    /// Value parsed as a number, compared with the operand
    Compare(CompareOp, f64),
    /// Substring containment
    Contains(String),
    /// `true` matches empty values, `false` non-empty ones
    Empty(bool),
    /// Caller-supplied predicate
    Predicate(PredicateFn),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Eq(s) => f.debug_tuple("Eq").field(s).finish(),
            Condition::Wildcard(re) => f.debug_tuple("Wildcard").field(&re.as_str()).finish(),
            Condition::Compare(op, n) => f.debug_tuple("Compare").field(op).field(n).finish(),
            Condition::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            Condition::Empty(b) => f.debug_tuple("Empty").field(b).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(<function>)"),
        }
    }
}

impl Condition {
    /// Compile a `*` pattern into an anchored regular expression
    pub fn wildcard(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let re = Regex::new(&format!("(?s)^{}$", body)).map_err(|e| {
            GridStoreError::InvalidArgument(format!("Invalid pattern '{}': {}", pattern, e))
        })?;
        Ok(Condition::Wildcard(re))
    }

    /// Equality, or a wildcard when the text contains `*`
    pub fn text(value: &str) -> Result<Self> {
        if value.contains('*') {
            Self::wildcard(value)
        } else {
            Ok(Condition::Eq(value.to_string()))
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Condition::Eq(expected) => value == expected,
            Condition::Wildcard(re) => re.is_match(value),
            Condition::Compare(op, operand) => value
                .trim()
                .parse::<f64>()
                .map(|v| op.holds(v, *operand))
                .unwrap_or(false),
            Condition::Contains(needle) => value.contains(needle.as_str()),
            Condition::Empty(empty) => value.is_empty() == *empty,
            Condition::Predicate(f) => f(value),
        }
    }

    fn from_json(value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::String(s) => Ok(vec![Self::text(s)?]),
            Value::Number(_) | Value::Bool(_) | Value::Null => {
                Ok(vec![Condition::Eq(scalar_text(value))])
            }
            Value::Object(ops) => ops
                .iter()
                .map(|(op, arg)| Self::operator(op, arg))
                .collect(),
            Value::Array(_) => Err(GridStoreError::InvalidArgument(
                "array query values are not supported".to_string(),
            )),
        }
    }

    fn operator(op: &str, arg: &Value) -> Result<Self> {
        let compare = |op: CompareOp| -> Result<Self> {
            let operand = match arg {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                GridStoreError::InvalidArgument(format!(
                    "comparison operand must be numeric: {}",
                    arg
                ))
            })?;
            Ok(Condition::Compare(op, operand))
        };

        match op {
            "$eq" => Ok(Condition::Eq(scalar_text(arg))),
            "$gt" => compare(CompareOp::Gt),
            "$lt" => compare(CompareOp::Lt),
            "$gte" => compare(CompareOp::Gte),
            "$lte" => compare(CompareOp::Lte),
            "$contains" => Ok(Condition::Contains(scalar_text(arg))),
            "$empty" => arg.as_bool().map(Condition::Empty).ok_or_else(|| {
                GridStoreError::InvalidArgument("$empty expects a boolean".to_string())
            }),
            other => Err(GridStoreError::InvalidArgument(format!(
                "Unknown query operator: '{}'",
                other
            ))),
        }
    }
}

/// A conjunction of field conditions
#[derive(Debug, Clone, Default)]
pub struct Query {
    terms: Vec<(String, Condition)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON query object; `null` is the empty query
    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(fields) => fields,
            other => {
                return Err(GridStoreError::InvalidArgument(format!(
                    "query must be an object, got {}",
                    other
                )))
            }
        };

        let mut query = Self::new();
        for (field, term) in fields {
            for condition in Condition::from_json(term)? {
                query.terms.push((field.clone(), condition));
            }
        }
        Ok(query)
    }

    /// Add a compiled term
    pub fn and(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.terms.push((field.into(), condition));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field, Condition::Eq(value.into()))
    }

    /// Wildcard match; a pattern without `*` is plain equality
    pub fn wildcard(self, field: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(self.and(field, Condition::text(pattern)?))
    }

    pub fn gt(self, field: impl Into<String>, operand: f64) -> Self {
        self.and(field, Condition::Compare(CompareOp::Gt, operand))
    }

    pub fn lt(self, field: impl Into<String>, operand: f64) -> Self {
        self.and(field, Condition::Compare(CompareOp::Lt, operand))
    }

    pub fn gte(self, field: impl Into<String>, operand: f64) -> Self {
        self.and(field, Condition::Compare(CompareOp::Gte, operand))
    }

    pub fn lte(self, field: impl Into<String>, operand: f64) -> Self {
        self.and(field, Condition::Compare(CompareOp::Lte, operand))
    }

    pub fn contains(self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.and(field, Condition::Contains(needle.into()))
    }

    pub fn empty(self, field: impl Into<String>, empty: bool) -> Self {
        self.and(field, Condition::Empty(empty))
    }

    pub fn predicate<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.and(field, Condition::Predicate(Arc::new(f)))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(String, Condition)] {
        &self.terms
    }

    /// Whether every term holds for the document
    pub fn matches(&self, doc: &Document) -> bool {
        self.terms
            .iter()
            .all(|(field, condition)| condition.matches(&doc.value(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(row: u32, fields: &[(&str, &str)]) -> Document {
        let mut doc = Document::new(row);
        for (k, v) in fields {
            doc.insert(k.to_string(), v.to_string());
        }
        doc
    }

    #[test]
    fn test_wildcard_shapes() {
        let prefix = Condition::wildcard("ca*").unwrap();
        assert!(prefix.matches("cat"));
        assert!(prefix.matches("ca"));
        assert!(!prefix.matches("scat"));

        let suffix = Condition::wildcard("*og").unwrap();
        assert!(suffix.matches("dog"));
        assert!(!suffix.matches("dogs"));

        let inner = Condition::wildcard("*a.b*").unwrap();
        assert!(inner.matches("xa.by"));
        assert!(!inner.matches("xaxby"));
    }

    #[test]
    fn test_wildcard_query_filters_in_order() {
        let docs = vec![
            doc(2, &[("name", "cat")]),
            doc(3, &[("name", "car")]),
            doc(4, &[("name", "dog")]),
        ];
        let query = Query::from_json(&json!({ "name": "ca*" })).unwrap();
        let rows: Vec<u32> = docs.iter().filter(|d| query.matches(d)).map(|d| d.row).collect();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn test_comparisons() {
        let d = doc(2, &[("age", "30"), ("note", "n/a")]);
        assert!(Query::new().gt("age", 29.0).matches(&d));
        assert!(!Query::new().lt("age", 30.0).matches(&d));
        assert!(Query::new().lte("age", 30.0).matches(&d));
        assert!(!Query::new().gte("note", 0.0).matches(&d));

        let parsed = Query::from_json(&json!({ "age": { "$gte": "18", "$lt": 65 } })).unwrap();
        assert_eq!(parsed.terms().len(), 2);
        assert!(parsed.matches(&d));
    }

    #[test]
    fn test_contains_empty_and_predicate() {
        let d = doc(2, &[("tags", "red,vip"), ("email", "")]);
        assert!(Query::new().contains("tags", "vip").matches(&d));
        assert!(Query::new().empty("email", true).matches(&d));
        assert!(Query::new().empty("missing", true).matches(&d));
        assert!(!Query::new().empty("tags", true).matches(&d));
        assert!(Query::new()
            .predicate("tags", |v| v.split(',').count() == 2)
            .matches(&d));
    }

    #[test]
    fn test_row_field_and_scalars() {
        let d = doc(5, &[("score", "10")]);
        assert!(Query::from_json(&json!({ "_row": 5 })).unwrap().matches(&d));
        assert!(Query::from_json(&json!({ "score": 10 })).unwrap().matches(&d));
        assert!(!Query::from_json(&json!({ "score": "1" })).unwrap().matches(&d));
    }

    #[test]
    fn test_invalid_queries() {
        assert!(Query::from_json(&json!({ "a": { "$regex": "x" } })).is_err());
        assert!(Query::from_json(&json!({ "a": { "$gt": "ten" } })).is_err());
        assert!(Query::from_json(&json!({ "a": [1, 2] })).is_err());
        assert!(Query::from_json(&json!("name")).is_err());
        assert!(Query::from_json(&Value::Null).unwrap().is_empty());
    }
}
