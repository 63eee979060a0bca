//! Bulk actions over the current selection

use std::sync::Arc;

use dashmap::DashSet;
use log::debug;
use log::warn;
use serde_json::Map;

use super::SelectionTracker;
use crate::error::BulkError;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::Value;
use crate::source::CachedSource;
use crate::source::FetchParams;

/// What a bulk action does to each selected record.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkKind {
    /// Sets one field to the same value on every record.
    SetField { field: String, value: Value },
    /// Removes every record.
    Delete,
}

/// A remote operation applied to a set of record ids.
///
/// # Example
///
/// ```
/// use schooldesk_lib::view::BulkAction;
///
/// let action = BulkAction::mark("students", "bulk_update_student_status", "status", "inactive")
///     .with_param("reason", "graduated");
/// assert_eq!(action.function, "bulk_update_student_status");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    /// Table whose records are affected.
    pub table: String,
    /// RPC function performing the change.
    pub function: String,
    pub kind: BulkKind,
    /// Extra arguments passed to the function.
    pub params: Map<String, serde_json::Value>,
}

impl BulkAction {
    /// Sets `field` to `value` on every selected record.
    pub fn mark(
        table: impl Into<String>,
        function: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            function: function.into(),
            kind: BulkKind::SetField {
                field: field.into(),
                value: value.into(),
            },
            params: Map::new(),
        }
    }

    /// Deletes every selected record.
    pub fn delete(table: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            function: function.into(),
            kind: BulkKind::Delete,
            params: Map::new(),
        }
    }

    /// Adds a function argument (builder pattern).
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Identifies the action for the in-flight guard. Two actions with the
    /// same key would send the same request.
    pub fn key(&self) -> String {
        let mut key = format!("{}/{}", self.table, self.function);
        if let BulkKind::SetField { field, value } = &self.kind {
            key.push_str(&format!(":{}={}", field, value.to_json()));
        }
        if !self.params.is_empty() {
            key.push_str(&format!("?{}", serde_json::Value::Object(self.params.clone())));
        }
        key
    }
}

/// Result of a successful bulk action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Ids the action was sent for, in view order.
    pub ids: Vec<RecordId>,
}

impl BulkOutcome {
    /// Number of records affected.
    pub fn affected(&self) -> usize {
        self.ids.len()
    }
}

/// Releases an in-flight key when dropped.
struct InFlightGuard {
    keys: Arc<DashSet<String>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(keys: &Arc<DashSet<String>>, key: String) -> Option<Self> {
        keys.insert(key.clone()).then(|| Self {
            keys: Arc::clone(keys),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

/// Sends bulk actions for a view's selection.
///
/// Ids are resolved from the selection at call time. On failure the
/// selection and cache are left exactly as they were; on success the
/// records cache is invalidated and the selection cleared.
#[derive(Clone)]
pub struct BulkDispatcher {
    source: CachedSource,
    params: FetchParams,
    in_flight: Arc<DashSet<String>>,
}

impl BulkDispatcher {
    /// Creates a dispatcher for the collection fetched with `params`.
    pub fn new(source: CachedSource, params: FetchParams) -> Self {
        Self {
            source,
            params,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Returns `true` while an identical action is waiting on the backend.
    pub fn is_in_flight(&self, action: &BulkAction) -> bool {
        self.in_flight.contains(&action.key())
    }

    /// Applies an action to the selected records of `filtered`.
    pub async fn apply(
        &self,
        action: &BulkAction,
        tracker: &mut SelectionTracker,
        filtered: &[&Record],
    ) -> Result<BulkOutcome, Error> {
        let resolved = tracker.resolve(filtered);
        if resolved.is_empty() {
            return Err(BulkError::EmptySelection.into());
        }

        let key = action.key();
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, key.clone()) else {
            return Err(BulkError::InFlight { action: key }.into());
        };

        debug!("{} for {} records", key, resolved.len());
        if let Err(e) = self.source.mutate(action, &resolved.ids).await {
            warn!("{} failed: {}", key, e);
            return Err(e);
        }

        self.source.invalidate_records(&self.params).await;
        tracker.clear();
        Ok(BulkOutcome { ids: resolved.ids })
    }
}
