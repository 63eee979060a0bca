//! Dynamic table record

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use super::Value;
use crate::error::FieldError;

/// Stable identifier of a record within a collection.
///
/// Identifiers are opaque strings; numeric ids on the wire are stringified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates an identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for RecordId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

/// One row of domain data (a student, a payment, ...).
///
/// Records hold field values as a `HashMap<String, Value>`, allowing dynamic
/// access to any field. Typed getter methods provide safe access with proper
/// error handling.
///
/// # Example
///
/// ```
/// use schooldesk_lib::model::Record;
///
/// let record = Record::new("s-1")
///     .set("first_name", "Amina")
///     .set("status", "active");
///
/// assert_eq!(record.get_string("first_name").unwrap(), Some("Amina"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    fields: HashMap<String, Value>,
}

impl Record {
    /// Creates a new empty record with the given identifier.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Builds a record from a wire row.
    ///
    /// The row must be a JSON object carrying a non-null `id_field`. The id
    /// field is kept in the field map as well, so it can be sorted and
    /// displayed like any other column.
    pub fn from_json(row: serde_json::Value, id_field: &str) -> Result<Self, FieldError> {
        let object = match row {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(FieldError::NotAnObject {
                    actual: json_type_name(&other),
                });
            }
        };

        let id = match object.get(id_field) {
            None | Some(serde_json::Value::Null) => return Err(FieldError::missing(id_field)),
            Some(serde_json::Value::String(s)) => RecordId::new(s.clone()),
            Some(serde_json::Value::Number(n)) => RecordId::new(n.to_string()),
            Some(other) => {
                return Err(FieldError::type_mismatch(id_field, "string", json_type_name(other)));
            }
        };

        let fields = object
            .into_iter()
            .map(|(key, value)| (key, Value::from_json(value)))
            .collect();

        Ok(Self { id, fields })
    }

    // =========================================================================
    // Raw field access
    // =========================================================================

    /// Returns the record identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the field value when present and not `Null`.
    pub fn non_null(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    // =========================================================================
    // Typed getters
    //
    // Return Err if field is missing or wrong type.
    // Return Ok(None) only if the field exists and is Value::Null.
    // =========================================================================

    /// Gets a string field value.
    pub fn get_string(&self, field: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::type_mismatch(field, "string", other.type_name())),
        }
    }

    /// Gets a string-list field value.
    pub fn get_list(&self, field: &str) -> Result<Option<&[String]>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(FieldError::type_mismatch(field, "list", other.type_name())),
        }
    }

    /// Gets a calendar date, accepting timestamps as well.
    pub fn get_date(&self, field: &str) -> Result<Option<NaiveDate>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(other) => other
                .as_date()
                .map(Some)
                .ok_or_else(|| FieldError::type_mismatch(field, "date", other.type_name())),
        }
    }

    /// Gets an integer field value.
    pub fn get_int(&self, field: &str) -> Result<Option<i64>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(FieldError::type_mismatch(field, "int", other.type_name())),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_numeric_id() {
        let record = Record::from_json(json!({"id": 7, "first_name": "Amina"}), "id").unwrap();
        assert_eq!(record.id().as_str(), "7");
        assert_eq!(record.get_string("first_name").unwrap(), Some("Amina"));
        assert_eq!(record.get_int("id").unwrap(), Some(7));
    }

    #[test]
    fn test_from_json_missing_id() {
        let err = Record::from_json(json!({"first_name": "Amina"}), "id").unwrap_err();
        assert_eq!(err, FieldError::missing("id"));

        let err = Record::from_json(json!({"id": null}), "id").unwrap_err();
        assert_eq!(err, FieldError::missing("id"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = Record::from_json(json!([1, 2]), "id").unwrap_err();
        assert_eq!(err, FieldError::NotAnObject { actual: "array" });
    }

    #[test]
    fn test_typed_getters() {
        let record = Record::new("s-1")
            .set("programs", vec!["Chess".to_string()])
            .set("admission_date", NaiveDate::from_ymd_opt(2024, 9, 1).unwrap())
            .set("phone", Value::Null);

        assert_eq!(record.get_list("programs").unwrap(), Some(&["Chess".to_string()][..]));
        assert_eq!(
            record.get_date("admission_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 1)
        );
        assert_eq!(record.get_string("phone").unwrap(), None);
        assert!(matches!(
            record.get_string("programs"),
            Err(FieldError::TypeMismatch { expected: "string", actual: "list", .. })
        ));
        assert!(record.get_string("email").is_err());
    }
}
