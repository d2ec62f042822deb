//! Account filter expressions carried by account-data rows.
//!
//! An account row's formula selects the accounts it aggregates. Two shapes
//! are accepted: a simple condition `["field", "op", "value"]` and a logical
//! combination `{"and"|"or": [condition, ...]}` with two or more entries,
//! nestable. Structurally invalid shapes are kept as an `Invalid` node that
//! applies no constraint; a condition whose operator or field cannot be
//! resolved against a record is dropped the same way.

use serde_json::Value;

use crate::error::FormulaError;

/// An account record: a flat field/value map.
pub type AccountRecord = serde_json::Map<String, Value>;

/// A parsed account filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `["field", "op", "value"]`.
    Simple {
        field: String,
        operator: String,
        value: Value,
    },
    /// `{"and": [...]}`: every sub-condition must hold.
    And(Vec<FilterExpr>),
    /// `{"or": [...]}`: at least one sub-condition must hold.
    Or(Vec<FilterExpr>),
    /// Structurally invalid; matches every record.
    Invalid,
}

impl FilterExpr {
    /// Parses a filter formula.
    ///
    /// Returns an error only when the text is not valid JSON; recognized
    /// JSON with an unexpected shape degrades to [`FilterExpr::Invalid`].
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FormulaError::InvalidFilter(e.to_string()))?;
        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::simple_from_items(items),
            Value::Object(map) => Self::logical_from_map(map),
            _ => FilterExpr::Invalid,
        }
    }

    fn simple_from_items(items: &[Value]) -> Self {
        let (Some(field), Some(operator)) = (
            items.first().and_then(Value::as_str),
            items.get(1).and_then(Value::as_str),
        ) else {
            return FilterExpr::Invalid;
        };
        if items.len() != 3 {
            return FilterExpr::Invalid;
        }
        FilterExpr::Simple {
            field: field.to_string(),
            operator: operator.to_string(),
            value: items[2].clone(),
        }
    }

    fn logical_from_map(map: &serde_json::Map<String, Value>) -> Self {
        if map.len() != 1 {
            return FilterExpr::Invalid;
        }
        let Some((key, sub)) = map.iter().next() else {
            return FilterExpr::Invalid;
        };
        let Some(items) = sub.as_array() else {
            return FilterExpr::Invalid;
        };
        if items.len() < 2 {
            return FilterExpr::Invalid;
        }
        let children: Vec<FilterExpr> = items.iter().map(Self::from_value).collect();
        match key.to_lowercase().as_str() {
            "and" => FilterExpr::And(children),
            "or" => FilterExpr::Or(children),
            _ => FilterExpr::Invalid,
        }
    }

    /// Tests whether an account record satisfies the filter.
    ///
    /// A node that resolves to no constraint (invalid shape, unknown
    /// operator, field absent from the record) matches.
    pub fn matches(&self, record: &AccountRecord) -> bool {
        self.condition(record).unwrap_or(true)
    }

    /// Resolves the filter to a concrete verdict for a record, or `None`
    /// when it applies no constraint.
    fn condition(&self, record: &AccountRecord) -> Option<bool> {
        match self {
            FilterExpr::Invalid => None,
            FilterExpr::Simple {
                field,
                operator,
                value,
            } => Self::field_condition(record, field, operator, value),
            FilterExpr::And(children) => {
                let verdicts: Vec<bool> =
                    children.iter().filter_map(|c| c.condition(record)).collect();
                if verdicts.is_empty() {
                    None
                } else {
                    Some(verdicts.into_iter().all(|v| v))
                }
            }
            FilterExpr::Or(children) => {
                let verdicts: Vec<bool> =
                    children.iter().filter_map(|c| c.condition(record)).collect();
                if verdicts.is_empty() {
                    None
                } else {
                    Some(verdicts.into_iter().any(|v| v))
                }
            }
        }
    }

    fn field_condition(
        record: &AccountRecord,
        field: &str,
        operator: &str,
        value: &Value,
    ) -> Option<bool> {
        // "is set" / "is not set" look at presence, everything else needs
        // the field on the record.
        if operator == "is" {
            let set = record.get(field).is_some_and(|v| !value_is_empty(v));
            return match value.as_str().map(str::to_lowercase).as_deref() {
                Some("set") => Some(set),
                Some("not set") => Some(!set),
                _ => None,
            };
        }

        let field_value = record.get(field)?;
        match operator {
            "=" | "==" => Some(values_equal(field_value, value)),
            "!=" | "<>" => Some(!values_equal(field_value, value)),
            "in" => value
                .as_array()
                .map(|items| items.iter().any(|v| values_equal(field_value, v))),
            "not in" => value
                .as_array()
                .map(|items| !items.iter().any(|v| values_equal(field_value, v))),
            "like" => like_contains(field_value, value),
            "not like" => like_contains(field_value, value).map(|m| !m),
            _ => None,
        }
    }
}

/// Loose equality: numbers compare numerically, everything else strictly.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Case-insensitive substring match, mirroring SQL `LIKE '%value%'`.
fn like_contains(field_value: &Value, value: &Value) -> Option<bool> {
    let haystack = value_as_text(field_value)?;
    let needle = value_as_text(value)?;
    Some(haystack.to_lowercase().contains(&needle.to_lowercase()))
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
