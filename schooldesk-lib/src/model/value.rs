//! Value enum for dynamic field values

use std::fmt;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// A dynamic value that can hold any field returned by the backend.
///
/// This enum is used in [`Record`](super::Record) to store field values
/// dynamically.
///
/// # Type Mapping
///
/// | JSON on the wire | Rust Variant |
/// |------------------|--------------|
/// | `null` | `Null` |
/// | `true` / `false` | `Bool` |
/// | integer | `Int` |
/// | other number | `Float` |
/// | RFC 3339 string | `DateTime` |
/// | `YYYY-MM-DD` string | `Date` |
/// | other string | `String` |
/// | array of strings | `List` |
/// | anything else | `Json` |
///
/// Variant order matters: the untagged representation is tried top to
/// bottom, so cached values deserialize back into the variant they were
/// written from.
///
/// # Example
///
/// ```
/// use schooldesk_lib::model::Value;
///
/// let name = Value::from("Amina");
/// let age = Value::from(12i64);
/// let programs = Value::from(vec!["Robotics".to_string()]);
/// let empty = Value::Null;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Timestamp with timezone.
    DateTime(DateTime<Utc>),
    /// Calendar date.
    Date(NaiveDate),
    /// String value.
    String(String),
    /// Ordered sequence of strings (e.g. program names).
    List(Vec<String>),
    /// Fallback for unrecognized JSON values.
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Json(_) => "json",
        }
    }

    /// Returns the numeric value for `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the calendar date for `Date` and `DateTime`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Converts a wire JSON value, recognising dates, timestamps and
    /// string arrays.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .unwrap_or(Value::Json(serde_json::Value::Number(n))),
            },
            serde_json::Value::String(s) => Value::parse_string(s),
            serde_json::Value::Array(items) if items.iter().all(|v| v.is_string()) => Value::List(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        serde_json::Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Value::Json(other),
        }
    }

    /// Converts back into wire JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::DateTime(_) | Value::Date(_) | Value::String(_) => {
                serde_json::Value::String(self.to_string())
            }
            Value::List(items) => serde_json::Value::from(items.clone()),
            Value::Json(v) => v.clone(),
        }
    }

    fn parse_string(s: String) -> Self {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return Value::DateTime(dt.with_timezone(&Utc));
        }
        if let Ok(d) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            return Value::Date(d);
        }
        Value::String(s)
    }
}

/// Renders the value the way it is searched and compared as text.
///
/// Lists are joined with `,`; `Null` renders as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::String(s) => f.write_str(s),
            Value::List(items) => f.write_str(&items.join(",")),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// From implementations
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}
