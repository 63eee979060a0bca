//! Row selection that survives filtering

use std::collections::BTreeSet;

use crate::model::Record;
use crate::model::RecordId;

/// What the user has selected.
///
/// `AllFiltered` is resolved lazily against whatever the filtered view is
/// at the time it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    AllFiltered,
    Explicit(BTreeSet<RecordId>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Explicit(BTreeSet::new())
    }
}

/// A selection resolved against a filtered view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSelection {
    /// The "select all" sentinel was active.
    pub all: bool,
    /// Selected ids present in the view, in view order.
    pub ids: Vec<RecordId>,
}

impl ResolvedSelection {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Tracks the selection across filter changes.
///
/// Ids hidden by a filter stay tracked and are reported again once a filter
/// change brings their records back.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selection: Selection,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Flips one id. With the sentinel active, the current view is first
    /// materialised into an explicit set.
    pub fn toggle(&mut self, id: &RecordId, view: &[&Record]) {
        if let Selection::AllFiltered = self.selection {
            self.selection = Selection::Explicit(view.iter().map(|r| r.id().clone()).collect());
        }
        if let Selection::Explicit(ids) = &mut self.selection {
            if !ids.remove(id) {
                ids.insert(id.clone());
            }
        }
    }

    /// Selects everything in the view, or clears when every visible row is
    /// already selected.
    pub fn select_all_visible(&mut self, view: &[&Record]) {
        let resolved = self.resolve(view);
        if !view.is_empty() && resolved.len() == view.len() {
            self.clear();
        } else {
            self.selection = Selection::AllFiltered;
        }
    }

    pub fn clear(&mut self) {
        self.selection = Selection::default();
    }

    /// Stops tracking one id, e.g. after its record was deleted.
    pub fn forget(&mut self, id: &RecordId) {
        if let Selection::Explicit(ids) = &mut self.selection {
            ids.remove(id);
        }
    }

    /// Returns `true` if the id counts as selected in the given view.
    pub fn is_selected(&self, id: &RecordId, view: &[&Record]) -> bool {
        match &self.selection {
            Selection::AllFiltered => view.iter().any(|r| r.id() == id),
            Selection::Explicit(ids) => ids.contains(id),
        }
    }

    /// Resolves the selection against a filtered view without changing it.
    pub fn resolve(&self, view: &[&Record]) -> ResolvedSelection {
        match &self.selection {
            Selection::AllFiltered => ResolvedSelection {
                all: true,
                ids: view.iter().map(|r| r.id().clone()).collect(),
            },
            Selection::Explicit(ids) => ResolvedSelection {
                all: false,
                ids: view
                    .iter()
                    .map(|r| r.id())
                    .filter(|id| ids.contains(*id))
                    .cloned()
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(ids: &[&str]) -> Vec<Record> {
        ids.iter().map(|id| Record::new(*id)).collect()
    }

    #[test]
    fn test_toggle_and_resolve() {
        let all = records(&["a", "b", "c"]);
        let view: Vec<&Record> = all.iter().collect();
        let mut tracker = SelectionTracker::new();

        tracker.toggle(&"c".into(), &view);
        tracker.toggle(&"a".into(), &view);
        let resolved = tracker.resolve(&view);
        assert!(!resolved.all);
        assert_eq!(resolved.ids, vec![RecordId::from("a"), RecordId::from("c")]);

        tracker.toggle(&"a".into(), &view);
        assert_eq!(tracker.resolve(&view).ids, vec![RecordId::from("c")]);
    }

    #[test]
    fn test_hidden_ids_come_back() {
        let all = records(&["a", "b", "c"]);
        let full: Vec<&Record> = all.iter().collect();
        let narrow: Vec<&Record> = all.iter().filter(|r| r.id().as_str() != "b").collect();
        let mut tracker = SelectionTracker::new();
        tracker.toggle(&"b".into(), &full);

        assert!(tracker.resolve(&narrow).is_empty());
        assert_eq!(tracker.resolve(&full).ids, vec![RecordId::from("b")]);
    }

    #[test]
    fn test_select_all_follows_the_view() {
        let all = records(&["a", "b", "c"]);
        let full: Vec<&Record> = all.iter().collect();
        let narrow = &full[..2];
        let mut tracker = SelectionTracker::new();

        tracker.select_all_visible(narrow);
        assert!(tracker.resolve(narrow).all);
        assert_eq!(tracker.resolve(narrow).len(), 2);
        assert_eq!(tracker.resolve(&full).len(), 3);

        // Everything visible already selected: clears.
        tracker.select_all_visible(narrow);
        assert!(tracker.resolve(&full).is_empty());
    }

    #[test]
    fn test_toggle_materialises_sentinel() {
        let all = records(&["a", "b", "c"]);
        let full: Vec<&Record> = all.iter().collect();
        let narrow = &full[..2];
        let mut tracker = SelectionTracker::new();

        tracker.select_all_visible(narrow);
        tracker.toggle(&"a".into(), narrow);
        assert_eq!(tracker.resolve(&full).ids, vec![RecordId::from("b")]);
        assert!(!tracker.resolve(&full).all);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let all = records(&["a", "b"]);
        let view: Vec<&Record> = all.iter().collect();
        let mut tracker = SelectionTracker::new();
        tracker.toggle(&"b".into(), &view);
        assert_eq!(tracker.resolve(&view), tracker.resolve(&view));
    }
}
