//! Scalar Result - the single value a question resolves to

use serde::Serialize;
use std::fmt;

/// First column of the first row. Absent rows and NULL aggregates become `Integer(0)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    /// Arbitrary-precision values keep the server's exact text.
    Numeric(String),
    Boolean(bool),
    Text(String),
}

impl Default for ScalarValue {
    fn default() -> Self {
        ScalarValue::Integer(0)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Numeric(v) | ScalarValue::Text(v) => write!(f, "{}", v),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl ScalarValue {
    /// Interpret a text-format column value given its Postgres type name.
    pub fn from_text(type_name: &str, text: &str) -> Self {
        match type_name {
            "INT2" | "INT4" | "INT8" | "OID" => text
                .parse()
                .map(ScalarValue::Integer)
                .unwrap_or_else(|_| ScalarValue::Text(text.to_string())),
            "FLOAT4" | "FLOAT8" => text
                .parse()
                .map(ScalarValue::Float)
                .unwrap_or_else(|_| ScalarValue::Text(text.to_string())),
            "NUMERIC" => ScalarValue::Numeric(text.to_string()),
            "BOOL" => ScalarValue::Boolean(text == "t" || text == "true"),
            _ => ScalarValue::Text(text.to_string()),
        }
    }
}
