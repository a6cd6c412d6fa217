//! Update operators
//!
//! A patch maps fields to operator lists compiled once per call:
//!
//! ```text
//! { "status": "done" }                          literal replace
//! { "score": { "$inc": 3 } }                    integer increment
//! { "name": { "$append": "!", "$uppercase": true } }
//! { "path": { "$replace": { "/": "_", " ": "" } } }
//! ```
//!
//! Operators for one field apply in order, each to the output of the last.

use crate::document::{scalar_text, ROW_FIELD};
use gridstore_common::{GridStoreError, Result};
use regex::{Captures, Regex};
use serde_json::Value;

/// Multi-pattern literal substitution applied in one pass
#[derive(Debug, Clone)]
pub struct Replacer {
    pairs: Vec<(String, String)>,
    pattern: Option<Regex>,
}

impl Replacer {
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();

        let pattern = if pairs.is_empty() {
            None
        } else {
            let alternation = pairs
                .iter()
                .map(|(k, _)| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).map_err(|e| {
                GridStoreError::InvalidArgument(format!("Invalid $replace pattern: {}", e))
            })?)
        };
        Ok(Self { pairs, pattern })
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn apply(&self, value: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return value.to_string();
        };
        pattern
            .replace_all(value, |caps: &Captures<'_>| {
                let matched = &caps[0];
                self.pairs
                    .iter()
                    .find(|(k, _)| k == matched)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}

impl PartialEq for Replacer {
    fn eq(&self, other: &Self) -> bool {
        self.pairs == other.pairs
    }
}

/// One operator applied to a field's current text
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String),
    Inc(i64),
    Append(String),
    Prepend(String),
    Lowercase,
    Uppercase,
    Replace(Replacer),
}

impl UpdateOp {
    pub fn apply(&self, current: &str) -> String {
        match self {
            UpdateOp::Set(value) => value.clone(),
            UpdateOp::Inc(by) => leading_integer(current).saturating_add(*by).to_string(),
            UpdateOp::Append(suffix) => format!("{}{}", current, suffix),
            UpdateOp::Prepend(prefix) => format!("{}{}", prefix, current),
            UpdateOp::Lowercase => current.to_lowercase(),
            UpdateOp::Uppercase => current.to_uppercase(),
            UpdateOp::Replace(replacer) => replacer.apply(current),
        }
    }

    fn from_json(op: &str, arg: &Value) -> Result<Self> {
        match op {
            "$set" => Ok(UpdateOp::Set(scalar_text(arg))),
            "$inc" => arg.as_i64().map(UpdateOp::Inc).ok_or_else(|| {
                GridStoreError::InvalidArgument(format!("$inc expects an integer, got {}", arg))
            }),
            "$append" => Ok(UpdateOp::Append(scalar_text(arg))),
            "$prepend" => Ok(UpdateOp::Prepend(scalar_text(arg))),
            "$lowercase" => Ok(UpdateOp::Lowercase),
            "$uppercase" => Ok(UpdateOp::Uppercase),
            "$replace" => {
                let map = arg.as_object().ok_or_else(|| {
                    GridStoreError::InvalidArgument("$replace expects an object".to_string())
                })?;
                let pairs = map
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => Ok((k.clone(), s.clone())),
                        other => Err(GridStoreError::InvalidArgument(format!(
                            "$replace value for '{}' must be a string, got {}",
                            k, other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(UpdateOp::Replace(Replacer::new(pairs)?))
            }
            other => Err(GridStoreError::InvalidArgument(format!(
                "Unknown update operator: '{}'",
                other
            ))),
        }
    }
}

/// Integer prefix of a value (optional sign, then digits), 0 when absent.
///
/// Digit runs past the `i64` range saturate at `i64::MAX` / `i64::MIN`.
fn leading_integer(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            let digit = i64::from(b - b'0');
            let acc = acc.saturating_mul(10);
            if negative {
                acc.saturating_sub(digit)
            } else {
                acc.saturating_add(digit)
            }
        })
}

/// Operators targeting one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPatch {
    pub field: String,
    pub ops: Vec<UpdateOp>,
}

impl FieldPatch {
    pub fn apply(&self, current: &str) -> String {
        self.ops
            .iter()
            .fold(current.to_string(), |value, op| op.apply(&value))
    }
}

/// Compiled field patches, in field order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Vec<FieldPatch>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            GridStoreError::InvalidArgument(format!("patch must be an object, got {}", value))
        })?;

        let mut patch = Self::new();
        for (field, change) in fields {
            match change {
                Value::Object(ops) => {
                    for (op, arg) in ops {
                        patch = patch.op(field.as_str(), UpdateOp::from_json(op, arg)?)?;
                    }
                }
                Value::Array(_) => {
                    return Err(GridStoreError::InvalidArgument(format!(
                        "array value for '{}' is not supported",
                        field
                    )))
                }
                scalar => {
                    patch = patch.op(field.as_str(), UpdateOp::Set(scalar_text(scalar)))?;
                }
            }
        }
        Ok(patch)
    }

    /// Add an operator; operators on the same field accumulate in order
    pub fn op(mut self, field: impl Into<String>, op: UpdateOp) -> Result<Self> {
        let field = field.into();
        if field.is_empty() || field == ROW_FIELD {
            return Err(GridStoreError::InvalidArgument(format!(
                "field '{}' cannot be updated",
                field
            )));
        }
        match self.fields.iter_mut().find(|p| p.field == field) {
            Some(existing) => existing.ops.push(op),
            None => self.fields.push(FieldPatch {
                field,
                ops: vec![op],
            }),
        }
        Ok(self)
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.op(field, UpdateOp::Set(value.into()))
    }

    pub fn inc(self, field: impl Into<String>, by: i64) -> Result<Self> {
        self.op(field, UpdateOp::Inc(by))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldPatch] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(patch: &Value, field: &str, current: &str) -> String {
        let patch = Patch::from_json(patch).unwrap();
        patch
            .fields()
            .iter()
            .find(|p| p.field == field)
            .unwrap()
            .apply(current)
    }

    #[test]
    fn test_inc() {
        let patch = json!({ "score": { "$inc": 3 } });
        assert_eq!(apply(&patch, "score", "5"), "8");
        assert_eq!(apply(&patch, "score", ""), "3");
        assert_eq!(apply(&patch, "score", "abc"), "3");
        assert_eq!(apply(&patch, "score", "-10"), "-7");
        assert_eq!(apply(&patch, "score", "12px"), "15");
    }

    #[test]
    fn test_inc_saturates_on_huge_values() {
        let up = json!({ "n": { "$inc": 1 } });
        assert_eq!(apply(&up, "n", "99999999999999999999"), i64::MAX.to_string());
        let down = json!({ "n": { "$inc": -1 } });
        assert_eq!(apply(&down, "n", "-99999999999999999999"), i64::MIN.to_string());
        assert_eq!(leading_integer("9223372036854775807"), i64::MAX);
        assert_eq!(leading_integer("-9223372036854775808"), i64::MIN);
    }

    #[test]
    fn test_literals() {
        assert_eq!(apply(&json!({ "s": "done" }), "s", "open"), "done");
        assert_eq!(apply(&json!({ "n": 42 }), "n", ""), "42");
        assert_eq!(apply(&json!({ "b": true }), "b", ""), "true");
    }

    #[test]
    fn test_text_operators_chain() {
        let patch = json!({ "name": { "$prepend": "<", "$append": ">", "$uppercase": true } });
        assert_eq!(apply(&patch, "name", "ann"), "<ANN>");
        assert_eq!(apply(&json!({ "n": { "$lowercase": 1 } }), "n", "MiXeD"), "mixed");
    }

    #[test]
    fn test_replace_is_single_pass() {
        let patch = json!({ "p": { "$replace": { "a": "b", "b": "a", ".": "" } } });
        assert_eq!(apply(&patch, "p", "ab.ba"), "baab");
    }

    #[test]
    fn test_invalid_patches() {
        assert!(Patch::from_json(&json!({ "s": { "$inc": 1.5 } })).is_err());
        assert!(Patch::from_json(&json!({ "s": { "$inc": "1" } })).is_err());
        assert!(Patch::from_json(&json!({ "s": { "$replace": { "a": 1 } } })).is_err());
        assert!(Patch::from_json(&json!({ "s": { "$pop": 1 } })).is_err());
        assert!(Patch::from_json(&json!({ "_row": 3 })).is_err());
        assert!(Patch::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_fluent_patch_merges_fields() {
        let patch = Patch::new()
            .set("a", "x")
            .unwrap()
            .inc("b", 2)
            .unwrap()
            .op("a", UpdateOp::Append("y".into()))
            .unwrap();
        assert_eq!(patch.fields().len(), 2);
        assert_eq!(patch.fields()[0].apply("old"), "xy");
        assert_eq!(patch.fields()[1].apply("1"), "3");
    }
}
