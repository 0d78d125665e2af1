//! Valor de entrada flexible.
//!
//! Los llamadores mandan el mismo campo como lista nativa, como texto JSON o
//! como texto delimitado (`"1, 3, 5"`). Se modela como unión etiquetada y
//! cada tipo de campo tiene su función de canonicalización en
//! [`crate::canonical`].
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FlexibleValue {
    /// Texto sin interpretar todavía.
    Raw(String),
    /// Lista ya estructurada.
    ParsedList(Vec<Value>),
    /// Escalar ya estructurado (número, booleano, null u objeto).
    ParsedScalar(Value),
}

impl FlexibleValue {
    pub fn raw(text: impl Into<String>) -> Self {
        FlexibleValue::Raw(text.into())
    }

    /// Representación textual para mensajes de error.
    pub fn display_raw(&self) -> String {
        match self {
            FlexibleValue::Raw(s) => s.clone(),
            FlexibleValue::ParsedList(items) => Value::Array(items.clone()).to_string(),
            FlexibleValue::ParsedScalar(v) => v.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlexibleValue::ParsedScalar(Value::Null))
    }
}

impl From<Value> for FlexibleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FlexibleValue::Raw(s),
            Value::Array(items) => FlexibleValue::ParsedList(items),
            other => FlexibleValue::ParsedScalar(other),
        }
    }
}

impl From<FlexibleValue> for Value {
    fn from(value: FlexibleValue) -> Self {
        match value {
            FlexibleValue::Raw(s) => Value::String(s),
            FlexibleValue::ParsedList(items) => Value::Array(items),
            FlexibleValue::ParsedScalar(v) => v,
        }
    }
}

impl From<&str> for FlexibleValue {
    fn from(s: &str) -> Self {
        FlexibleValue::Raw(s.to_string())
    }
}
