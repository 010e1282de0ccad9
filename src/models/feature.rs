use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A feature value resolved once at the export data-access boundary.
///
/// All rendering (CSV and JSON) consumes this tagged union; raw dynamic JSON
/// never reaches a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl FeatureValue {
    /// Resolve a dynamic JSON value. Arrays and objects are not feature
    /// values; they collapse to their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// One row of an export: values aligned with the source's column schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub values: Vec<FeatureValue>,
}

impl ExportRow {
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }
}
