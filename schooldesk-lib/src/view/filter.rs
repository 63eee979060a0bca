//! Record inclusion: filter axes and free-text search

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;

use super::Criterion;
use super::FilterCriteria;
use super::ViewSchema;
use crate::model::Record;
use crate::model::ReferenceCollection;
use crate::model::Value;

/// Decides which records pass the current criteria and search text.
///
/// Holds the reference collections needed to resolve criteria (program id
/// to program name) and search labels (branch id to branch name), plus the
/// instant the date window is measured from.
#[derive(Debug, Clone, Copy)]
pub struct FilterEvaluator<'a> {
    schema: &'a ViewSchema,
    branches: Option<&'a ReferenceCollection>,
    programs: Option<&'a ReferenceCollection>,
    now: DateTime<Utc>,
}

impl<'a> FilterEvaluator<'a> {
    /// Creates an evaluator measuring date windows from the current time.
    pub fn new(schema: &'a ViewSchema) -> Self {
        Self {
            schema,
            branches: None,
            programs: None,
            now: Utc::now(),
        }
    }

    /// Uses a branch collection for search labels.
    pub fn with_branches(mut self, branches: &'a ReferenceCollection) -> Self {
        self.branches = Some(branches);
        self
    }

    /// Uses a program collection to resolve program criteria.
    pub fn with_programs(mut self, programs: &'a ReferenceCollection) -> Self {
        self.programs = Some(programs);
        self
    }

    /// Measures date windows from a fixed instant.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Returns `true` if the record passes every axis.
    ///
    /// Wildcard axes always pass; a missing or null field fails any
    /// concrete axis.
    pub fn matches(&self, record: &Record, criteria: &FilterCriteria) -> bool {
        self.branch_matches(record, criteria.branch())
            && self.program_matches(record, criteria.program())
            && self.status_matches(record, criteria.status())
            && self.window_matches(record, criteria.admitted_within())
    }

    fn branch_matches(&self, record: &Record, branch: &Criterion<String>) -> bool {
        let Some(branch) = branch.value() else {
            return true;
        };
        record
            .non_null(&self.schema.branch_field)
            .is_some_and(|v| contains_exact(v, branch))
    }

    fn program_matches(&self, record: &Record, program: &Criterion<String>) -> bool {
        let Some(program) = program.value() else {
            return true;
        };
        // Criteria carry program ids, records carry program names.
        let name = self
            .programs
            .and_then(|p| p.label(program))
            .unwrap_or(program.as_str())
            .to_lowercase();
        record
            .non_null(&self.schema.programs_field)
            .is_some_and(|v| elements(v).any(|e| e.to_lowercase() == name))
    }

    fn status_matches(&self, record: &Record, status: &Criterion<String>) -> bool {
        let Some(status) = status.value() else {
            return true;
        };
        record
            .non_null(&self.schema.status_field)
            .is_some_and(|v| contains_exact(v, status))
    }

    fn window_matches(&self, record: &Record, days: &Criterion<u32>) -> bool {
        let Some(days) = days.value() else {
            return true;
        };
        // A window reaching past the calendar's range has no lower bound.
        let cutoff = TimeDelta::try_days(i64::from(*days))
            .and_then(|window| self.now.checked_sub_signed(window))
            .map(|start| start.date_naive());
        record
            .non_null(&self.schema.date_field)
            .and_then(Value::as_date)
            .is_some_and(|date| cutoff.is_none_or(|cutoff| date >= cutoff))
    }

    /// Free-text search over the configured fields and the resolved branch
    /// label. A blank query matches everything.
    pub fn search(&self, record: &Record, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&needle);

        let in_fields = self
            .schema
            .search_fields
            .iter()
            .filter_map(|field| record.non_null(field))
            .any(|value| elements(value).any(|e| hit(&e)));

        in_fields || self.branch_label(record).is_some_and(hit)
    }

    fn branch_label(&self, record: &Record) -> Option<&'a str> {
        let branches = self.branches?;
        let id = record.non_null(&self.schema.branch_field)?.to_string();
        branches.label(&id)
    }
}

/// Scalar values yield their text once; lists yield each element.
fn elements(value: &Value) -> Box<dyn Iterator<Item = String> + '_> {
    match value {
        Value::List(items) => Box::new(items.iter().cloned()),
        other => Box::new(std::iter::once(other.to_string())),
    }
}

fn contains_exact(value: &Value, expected: &str) -> bool {
    elements(value).any(|e| e == expected)
}

/// Narrows a snapshot to the records passing both criteria and search,
/// keeping snapshot order.
pub fn filter_records<'r>(
    records: &'r [Record],
    criteria: &FilterCriteria,
    query: &str,
    evaluator: &FilterEvaluator<'_>,
) -> Vec<&'r Record> {
    records
        .iter()
        .filter(|r| evaluator.matches(r, criteria) && evaluator.search(r, query))
        .collect()
}
