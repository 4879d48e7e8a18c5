//! Field data types and JSON value checks.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Data type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    String,
    Text,
    Boolean,
    Float,
    Money,
    Date,
}

impl DataType {
    /// Every built-in data type.
    pub const ALL: [DataType; 7] = [
        DataType::Integer,
        DataType::String,
        DataType::Text,
        DataType::Boolean,
        DataType::Float,
        DataType::Money,
        DataType::Date,
    ];

    /// Returns the canonical type name (e.g. "Integer").
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "Integer",
            DataType::String => "String",
            DataType::Text => "Text",
            DataType::Boolean => "Boolean",
            DataType::Float => "Float",
            DataType::Money => "Money",
            DataType::Date => "Date",
        }
    }

    /// Human readable description of the values this type accepts.
    pub fn expected(&self) -> &'static str {
        match self {
            DataType::Integer => "an integer",
            DataType::String | DataType::Text => "a string",
            DataType::Boolean => "a boolean",
            DataType::Float | DataType::Money => "a number",
            DataType::Date => "a date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)",
        }
    }

    /// Checks whether a JSON value is acceptable for this type.
    ///
    /// `null` is accepted for every type; required-ness is checked separately.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (DataType::String | DataType::Text, Value::String(_)) => true,
            (DataType::Boolean, Value::Bool(_)) => true,
            (DataType::Float | DataType::Money, Value::Number(_)) => true,
            (DataType::Date, Value::String(s)) => is_date(s),
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ApiError::InvalidValue {
                entity: "CustomField".to_string(),
                field: "data_type".to_string(),
                message: format!("unknown data type '{}'", s),
            })
    }
}

/// Name of a JSON value's type, as used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}
