use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed cell value in a normalized [`crate::Table`].
///
/// The enum uses an explicit `{type, value}` tagged layout so JSON consumers can branch on the
/// variant without guessing from the payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty cell, or padding added to a short row.
    #[default]
    Null,
    Int(i64),
    /// IEEE-754 double precision number.
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// Infer a typed value from raw cell text.
///
/// Conversions are attempted in a fixed order on the trimmed text: integer, float, boolean, and
/// finally text. Empty (or whitespace-only) input is [`CellValue::Null`]. The order is
/// significant: `"1"` is an integer, never `true`.
pub fn coerce(text: &str) -> CellValue {
    let text = text.trim();
    if text.is_empty() {
        return CellValue::Null;
    }

    if let Ok(v) = text.parse::<i64>() {
        return CellValue::Int(v);
    }

    if let Ok(v) = text.parse::<f64>() {
        return CellValue::Float(v);
    }

    if let Some(v) = parse_bool(text) {
        return CellValue::Bool(v);
    }

    CellValue::Text(text.to_string())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
