//! Data-encoding rule for blobs and property values.
//!
//! Inputs arrive in one of three shapes: a sequence of byte values, a single
//! integer, or a text string. [`DataValue`] names those shapes explicitly and
//! [`DataValue::encode`] turns each into the canonical bytes that are stored.
//! Anything else is rejected when it is converted into a `DataValue`, before
//! any storage code runs.

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// One of the accepted input shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    /// Raw bytes, stored verbatim.
    Bytes(Vec<u8>),
    /// An integer, stored as its decimal text.
    Integer(i64),
    /// Text, stored as UTF-8.
    Text(String),
}

impl DataValue {
    /// Canonical byte form.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Integer(n) => n.to_string().into_bytes(),
            Self::Text(text) => text.clone().into_bytes(),
        }
    }

    /// Canonical text form, required for property values.
    ///
    /// Byte sequences that are not valid UTF-8 cannot live in the text
    /// column and are reported as [`StoreError::UnsupportedDataType`].
    pub fn encode_text(&self) -> StoreResult<String> {
        match self {
            Self::Bytes(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|_| StoreError::UnsupportedDataType {
                    found: "non-UTF-8 byte sequence".into(),
                })
            }
            Self::Integer(n) => Ok(n.to_string()),
            Self::Text(text) => Ok(text.clone()),
        }
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for DataValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for DataValue {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<String> for DataValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for DataValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl TryFrom<Value> for DataValue {
    type Error = StoreError;

    /// Map a loosely typed wire value onto an input shape.
    ///
    /// Arrays must hold integers in `0..=255`; numbers must be integral.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(|| {
                StoreError::UnsupportedDataType {
                    found: format!("number {n}"),
                }
            }),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| StoreError::UnsupportedDataType {
                            found: format!("array item {item}"),
                        })
                })
                .collect::<StoreResult<Vec<u8>>>()
                .map(Self::Bytes),
            other => Err(StoreError::UnsupportedDataType {
                found: json_kind(&other).into(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── tests ────────────────────────────────────────────────────────────
