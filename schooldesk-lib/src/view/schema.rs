//! Field layout of a table

use std::collections::HashMap;

use serde::Deserialize;

use super::ColumnDef;
use super::SortDescriptor;
use crate::model::Record;
use crate::model::Value;

/// A display label computed from a coded field when records are loaded.
///
/// Sorting on the source column goes through an alias to `target`, so the
/// table orders by what the user reads rather than by the raw code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DerivedLabel {
    pub source: String,
    pub target: String,
    pub labels: HashMap<String, String>,
}

impl DerivedLabel {
    /// Writes `target` on a record. Unknown codes are copied as-is; a
    /// missing or null source yields `Null`.
    pub fn apply(&self, record: &mut Record) {
        let label = match record.non_null(&self.source) {
            Some(value) => {
                let code = value.to_string();
                Value::String(self.labels.get(&code).cloned().unwrap_or(code))
            }
            None => Value::Null,
        };
        record.insert(self.target.clone(), label);
    }
}

/// Describes which record fields drive each filter axis, search, and
/// sorting, plus the RPC functions behind the table's actions.
///
/// The default is the student table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewSchema {
    /// Logical table name used for fetching and cache keys.
    pub table: String,
    /// Scalar field holding the branch identifier.
    pub branch_field: String,
    /// Field holding program names (a list or a single string).
    pub programs_field: String,
    /// Scalar status field.
    pub status_field: String,
    /// Date field the admission window applies to.
    pub date_field: String,
    /// Fields searched by the free-text box.
    pub search_fields: Vec<String>,
    /// Sort column to the field actually compared.
    pub sort_aliases: HashMap<String, String>,
    /// Labels computed on load.
    pub derived_labels: Vec<DerivedLabel>,
    /// Sort applied when the view opens.
    pub default_sort: SortDescriptor,
    /// Rows per page when the view opens.
    pub page_size: usize,
    /// Column definitions in display order.
    pub columns: Vec<ColumnDef>,
    /// RPC function that changes the status of a batch of ids.
    pub status_function: String,
    /// RPC function that deletes a batch of ids.
    pub delete_function: String,
}

impl Default for ViewSchema {
    fn default() -> Self {
        Self::students()
    }
}

impl ViewSchema {
    /// The student table.
    pub fn students() -> Self {
        Self {
            table: "students".to_string(),
            branch_field: "branch_id".to_string(),
            programs_field: "program_names".to_string(),
            status_field: "status".to_string(),
            date_field: "admission_date".to_string(),
            search_fields: ["first_name", "last_name", "email", "phone", "program_names"]
                .into_iter()
                .map(String::from)
                .collect(),
            sort_aliases: HashMap::from([("gender".to_string(), "gender_label".to_string())]),
            derived_labels: vec![DerivedLabel {
                source: "gender".to_string(),
                target: "gender_label".to_string(),
                labels: HashMap::from([
                    ("M".to_string(), "Male".to_string()),
                    ("F".to_string(), "Female".to_string()),
                ]),
            }],
            default_sort: SortDescriptor::asc("first_name"),
            page_size: 10,
            columns: vec![
                ColumnDef::new("first_name", "First name"),
                ColumnDef::new("last_name", "Last name"),
                ColumnDef::new("gender", "Gender"),
                ColumnDef::new("email", "Email"),
                ColumnDef::new("phone", "Phone"),
                ColumnDef::new("program_names", "Programs"),
                ColumnDef::new("status", "Status"),
                ColumnDef::new("admission_date", "Admitted"),
            ],
            status_function: "bulk_update_student_status".to_string(),
            delete_function: "delete_students".to_string(),
        }
    }

    /// Sets the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the default sort.
    pub fn with_default_sort(mut self, sort: SortDescriptor) -> Self {
        self.default_sort = sort;
        self
    }

    /// Sets the initial page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Adds a sort alias.
    pub fn with_sort_alias(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.sort_aliases.insert(column.into(), field.into());
        self
    }

    /// Resolves a sort column to the field compared.
    pub fn sort_field<'a>(&'a self, column: &'a str) -> &'a str {
        self.sort_aliases
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    /// Applies every derived label to a record.
    pub fn enrich(&self, record: &mut Record) {
        for label in &self.derived_labels {
            label.apply(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_gender_label() {
        let schema = ViewSchema::students();

        let mut known = Record::new("s-1").set("gender", "F");
        schema.enrich(&mut known);
        assert_eq!(known.get("gender_label"), Some(&Value::from("Female")));

        let mut unknown = Record::new("s-2").set("gender", "X");
        schema.enrich(&mut unknown);
        assert_eq!(unknown.get("gender_label"), Some(&Value::from("X")));

        let mut missing = Record::new("s-3");
        schema.enrich(&mut missing);
        assert_eq!(missing.get("gender_label"), Some(&Value::Null));
    }

    #[test]
    fn test_sort_field_alias() {
        let schema = ViewSchema::students();
        assert_eq!(schema.sort_field("gender"), "gender_label");
        assert_eq!(schema.sort_field("email"), "email");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let schema: ViewSchema =
            serde_json::from_str(r#"{"table": "teachers", "page_size": 25}"#).unwrap();
        assert_eq!(schema.table, "teachers");
        assert_eq!(schema.page_size, 25);
        assert_eq!(schema.status_field, "status");
    }
}
