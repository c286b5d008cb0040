//! Values accepted by the parser

use crate::error::{DslError, DslResult};

/// A blueprint value to interpret as a DSL expression.
///
/// Text goes through the grammar; numbers and booleans are wrapped as
/// constants without parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum DslInput {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl DslInput {
    /// Convert a JSON (or YAML-decoded) value.
    ///
    /// Null, arrays and objects have no DSL form.
    pub fn from_json(value: &serde_json::Value) -> DslResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(DslInput::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(DslInput::Number)
                .ok_or_else(|| DslError::UnsupportedInput(format!("number {}", n))),
            serde_json::Value::Bool(b) => Ok(DslInput::Bool(*b)),
            serde_json::Value::Null => Err(DslError::UnsupportedInput("null".to_string())),
            serde_json::Value::Array(_) => Err(DslError::UnsupportedInput("array".to_string())),
            serde_json::Value::Object(_) => Err(DslError::UnsupportedInput("object".to_string())),
        }
    }
}

impl From<&str> for DslInput {
    fn from(s: &str) -> Self {
        DslInput::Text(s.to_string())
    }
}

impl From<String> for DslInput {
    fn from(s: String) -> Self {
        DslInput::Text(s)
    }
}

impl From<&String> for DslInput {
    fn from(s: &String) -> Self {
        DslInput::Text(s.clone())
    }
}

impl From<f64> for DslInput {
    fn from(n: f64) -> Self {
        DslInput::Number(n)
    }
}

impl From<i64> for DslInput {
    fn from(n: i64) -> Self {
        DslInput::Number(n as f64)
    }
}

impl From<bool> for DslInput {
    fn from(b: bool) -> Self {
        DslInput::Bool(b)
    }
}
