use crate::catalog::fields;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A raw pipeline box as returned by the CRM. No schema is enforced upstream, so every
/// accessor tolerates absent keys and wrongly-typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

/// A custom-field lookup result. Consumers match on all branches instead of coercing.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    /// Missing, null or an object.
    Absent,
    Text(&'a str),
    Number(&'a Number),
    /// List items stringified; nulls dropped.
    List(Vec<String>),
}

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn key(&self) -> String {
        scalar_text(self.0.get("key"))
    }

    pub fn name(&self) -> String {
        scalar_text(self.0.get("name"))
    }

    pub fn stage_key(&self) -> String {
        scalar_text(self.0.get("stageKey"))
    }

    /// Top-level epoch-millisecond timestamp such as `creationTimestamp`.
    pub fn timestamp_ms(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn field_value(&self, key: &str) -> FieldValue<'_> {
        let Some(value) = self.0.get("fields").and_then(|f| f.get(key)) else {
            return FieldValue::Absent;
        };
        match value {
            Value::Null | Value::Object(_) => FieldValue::Absent,
            Value::Bool(true) => FieldValue::Text("true"),
            Value::Bool(false) => FieldValue::Text("false"),
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => FieldValue::Number(n),
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    /// Monetary value of the box; 0 when absent or unparsable.
    pub fn price(&self) -> f64 {
        match self.field_value(fields::PRICE) {
            FieldValue::Absent | FieldValue::List(_) => 0.0,
            FieldValue::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
            FieldValue::Text(raw) => parse_amount(raw).unwrap_or_else(|| {
                log::debug!("Unparsable price {raw:?} on box {}", self.key());
                0.0
            }),
        }
    }

    /// Whether a field carries a value once `exclude` sentinels are removed from lists.
    pub fn is_set(&self, key: &str, exclude: &[&str]) -> bool {
        match self.field_value(key) {
            FieldValue::Absent => false,
            FieldValue::Number(_) => true,
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::List(items) => items.iter().any(|item| !exclude.contains(&item.as_str())),
        }
    }

    /// Trimmed display text of a field; empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.field_value(key).display()
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl FieldValue<'_> {
    /// Raw option keys: list items, or the scalar as a single item.
    pub fn items(&self) -> Vec<String> {
        match self {
            FieldValue::Absent => Vec::new(),
            FieldValue::Text(s) if s.trim().is_empty() => Vec::new(),
            FieldValue::Text(s) => vec![s.trim().to_string()],
            FieldValue::Number(n) => vec![n.to_string()],
            FieldValue::List(items) => items.clone(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::List(items) => items.join(", ").trim().to_string(),
        }
    }
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parses "$1,200.50"-style amounts; `None` for anything that is not a finite number.
/// Only surrounding whitespace is ignored, so "1 200" is rejected.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ','))
        .collect();
    let cleaned = stripped.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
