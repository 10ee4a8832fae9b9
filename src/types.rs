//! Cell value type shared by every reader.
//!
//! Readers emit raw rows as `Vec<Value>`. Values are only as typed as the source format makes
//! them: CSV cells are always [`Value::Utf8`], JSON numbers become [`Value::Int64`] or
//! [`Value::Float64`], fixed-width columns are coerced according to their declared type.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, Serializer};

/// A single untyped-at-the-schema-level cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without a timezone.
    DateTime(NaiveDateTime),
    /// A composite JSON value (array, or object when flattening is off) preserved as-is.
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string payload of a [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload of a [`Value::Int64`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload as `f64` for [`Value::Int64`] and [`Value::Float64`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert a parsed JSON value into a cell.
    ///
    /// Scalars map to their natural variant; arrays and objects are kept whole.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => n.as_f64().map(Value::Float64).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Utf8(s.clone()),
            other => Value::Json(other.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Utf8(v) => serializer.serialize_str(v),
            Value::Date(_) | Value::DateTime(_) => serializer.collect_str(self),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Utf8(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Utf8(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;

    #[test]
    fn from_json_maps_scalars_and_keeps_composites() {
        let v: serde_json::Value =
            serde_json::from_str(r#"[null, true, 3, 2.5, "x", [1, 2], {"a": 1}]"#).unwrap();
        let items = v.as_array().unwrap();
        assert_eq!(Value::from_json(&items[0]), Value::Null);
        assert_eq!(Value::from_json(&items[1]), Value::Bool(true));
        assert_eq!(Value::from_json(&items[2]), Value::Int64(3));
        assert_eq!(Value::from_json(&items[3]), Value::Float64(2.5));
        assert_eq!(Value::from_json(&items[4]), Value::Utf8("x".to_string()));
        assert_eq!(Value::from_json(&items[5]), Value::Json(items[5].clone()));
        assert_eq!(Value::from_json(&items[6]), Value::Json(items[6].clone()));
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int64(7).to_string(), "7");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }
}
