//! In-memory tables

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::DataSource;
use super::FetchParams;
use super::PageRequest;
use super::PagedSource;
use super::Pages;
use crate::error::ApiError;
use crate::error::ConfigError;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::ReferenceCollection;
use crate::model::ReferenceKind;
use crate::view::BulkAction;
use crate::view::BulkKind;

/// A backend held entirely in memory.
///
/// Serves tables in pages like a remote backend would, so the same drain
/// logic runs against it. Filter parameters are ignored. Mutations are
/// all-or-nothing: every id must exist or nothing changes.
///
/// # Example
///
/// ```
/// use schooldesk_lib::model::Record;
/// use schooldesk_lib::source::MemorySource;
///
/// let source = MemorySource::new(100)
///     .with_table("students", vec![Record::new("s-1").set("status", "active")]);
/// ```
#[derive(Debug)]
pub struct MemorySource {
    state: RwLock<MemoryState>,
    page_size: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Record>>,
    references: HashMap<ReferenceKind, ReferenceCollection>,
}

/// JSON fixture layout: rows per table and rows per reference kind.
///
/// ```json
/// {
///   "tables": { "students": [{ "id": "s-1", "first_name": "Amina" }] },
///   "references": { "branches": [{ "id": "b1", "name": "North" }] }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    tables: HashMap<String, Vec<serde_json::Value>>,
    #[serde(default)]
    references: HashMap<String, Vec<serde_json::Value>>,
}

impl MemorySource {
    /// Creates an empty source serving pages of `page_size` rows.
    pub fn new(page_size: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            page_size,
        }
    }

    /// Loads tables and references from a JSON fixture.
    ///
    /// Records are keyed by `id_field`; reference rows use `id` and `name`.
    pub fn from_fixture(json: &str, id_field: &str, page_size: usize) -> Result<Self, Error> {
        let fixture: Fixture = serde_json::from_str(json).map_err(ConfigError::Parse)?;

        let mut state = MemoryState::default();
        for (table, rows) in fixture.tables {
            let records = rows
                .into_iter()
                .map(|row| Record::from_json(row, id_field))
                .collect::<Result<Vec<_>, _>>()?;
            state.tables.insert(table, records);
        }
        for (name, rows) in fixture.references {
            let kind = ReferenceKind::from_name(&name);
            let collection = ReferenceCollection::from_rows(kind.clone(), rows, "id", "name")?;
            state.references.insert(kind, collection);
        }

        Ok(Self {
            state: RwLock::new(state),
            page_size,
        })
    }

    /// Adds a table (builder pattern).
    pub fn with_table(self, table: impl Into<String>, records: Vec<Record>) -> Self {
        let mut state = self.state.into_inner();
        state.tables.insert(table.into(), records);
        Self {
            state: RwLock::new(state),
            page_size: self.page_size,
        }
    }

    /// Adds a reference collection (builder pattern).
    pub fn with_reference(self, collection: ReferenceCollection) -> Self {
        let mut state = self.state.into_inner();
        state.references.insert(collection.kind().clone(), collection);
        Self {
            state: RwLock::new(state),
            page_size: self.page_size,
        }
    }

    /// Returns a snapshot of a table.
    pub async fn table(&self, table: &str) -> Vec<Record> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PagedSource for MemorySource {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(
        &self,
        params: &FetchParams,
        page: PageRequest,
    ) -> Result<Vec<Record>, Error> {
        let state = self.state.read().await;
        let rows = state.tables.get(&params.table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch_all(&self, params: &FetchParams) -> Result<Vec<Record>, Error> {
        Pages::new(self, params).drain().await
    }

    async fn fetch_reference(&self, kind: &ReferenceKind) -> Result<ReferenceCollection, Error> {
        Ok(self
            .state
            .read()
            .await
            .references
            .get(kind)
            .cloned()
            .unwrap_or_else(|| ReferenceCollection::new(kind.clone())))
    }

    async fn mutate(&self, action: &BulkAction, ids: &[RecordId]) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let rows = state
            .tables
            .get_mut(&action.table)
            .ok_or_else(|| ApiError::Remote(format!("unknown table '{}'", action.table)))?;

        let present: HashSet<&RecordId> = rows.iter().map(Record::id).collect();
        if let Some(missing) = ids.iter().find(|id| !present.contains(id)) {
            return Err(ApiError::Remote(format!("record {} not found", missing)).into());
        }

        let targets: HashSet<&RecordId> = ids.iter().collect();
        match &action.kind {
            BulkKind::SetField { field, value } => {
                for record in rows.iter_mut().filter(|r| targets.contains(r.id())) {
                    record.insert(field.clone(), value.clone());
                }
            }
            BulkKind::Delete => rows.retain(|r| !targets.contains(r.id())),
        }
        debug!("{} applied to {} {} rows", action.function, ids.len(), action.table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    const FIXTURE: &str = r#"{
        "tables": {
            "students": [
                {"id": "s-1", "first_name": "Amina", "status": "active"},
                {"id": "s-2", "first_name": "Bilal", "status": "active"},
                {"id": "s-3", "first_name": "Chen", "status": "inactive"}
            ]
        },
        "references": {
            "branches": [{"id": "b1", "name": "North"}]
        }
    }"#;

    #[tokio::test]
    async fn test_fixture_is_drained_in_pages() {
        let source = MemorySource::from_fixture(FIXTURE, "id", 2).unwrap();
        let records = source.fetch_all(&FetchParams::table("students")).await.unwrap();
        assert_eq!(records.len(), 3);

        let branches = source.fetch_reference(&ReferenceKind::Branches).await.unwrap();
        assert_eq!(branches.label("b1"), Some("North"));

        let programs = source.fetch_reference(&ReferenceKind::Programs).await.unwrap();
        assert!(programs.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_is_all_or_nothing() {
        let source = MemorySource::from_fixture(FIXTURE, "id", 10).unwrap();
        let action = BulkAction::mark("students", "bulk_update_status", "status", "inactive");

        let err = source
            .mutate(&action, &[RecordId::from("s-1"), RecordId::from("s-9")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Remote(_))));
        let unchanged = source.table("students").await;
        assert_eq!(unchanged[0].get("status"), Some(&Value::from("active")));

        source
            .mutate(&action, &[RecordId::from("s-1"), RecordId::from("s-2")])
            .await
            .unwrap();
        let updated = source.table("students").await;
        assert!(updated.iter().all(|r| r.get("status") == Some(&Value::from("inactive"))));
    }

    #[tokio::test]
    async fn test_delete() {
        let source = MemorySource::from_fixture(FIXTURE, "id", 10).unwrap();
        let action = BulkAction::delete("students", "delete_students");

        source.mutate(&action, &[RecordId::from("s-2")]).await.unwrap();
        let ids: Vec<_> = source
            .table("students")
            .await
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["s-1", "s-3"]);
    }
}
