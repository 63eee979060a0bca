//! Per-axis filter criteria

use serde::Deserialize;
use serde::Serialize;

/// One filter axis: either the "all" wildcard or a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Criterion<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Criterion<T> {
    /// Returns `true` for the wildcard.
    pub fn is_all(&self) -> bool {
        matches!(self, Criterion::All)
    }

    /// Returns the concrete value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Criterion::All => None,
            Criterion::Only(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Criterion<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Criterion::Only(v),
            None => Criterion::All,
        }
    }
}

impl From<&str> for Criterion<String> {
    fn from(v: &str) -> Self {
        Criterion::Only(v.to_string())
    }
}

/// Names a filter axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Branch,
    Program,
    Status,
    AdmittedWithin,
}

/// The current filter constraints. Axes combine with logical AND.
///
/// Changing the branch resets the program to the wildcard, since a program
/// chosen under one branch may not exist under another.
///
/// # Example
///
/// ```
/// use schooldesk_lib::view::{Criterion, FilterCriteria};
///
/// let mut criteria = FilterCriteria::all();
/// criteria.set_branch("b1".into());
/// criteria.set_program("p1".into());
/// criteria.set_branch("b2".into());
/// assert!(criteria.program().is_all());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    branch: Criterion<String>,
    program: Criterion<String>,
    status: Criterion<String>,
    admitted_within: Criterion<u32>,
}

impl FilterCriteria {
    /// Every axis set to the wildcard.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn branch(&self) -> &Criterion<String> {
        &self.branch
    }

    pub fn program(&self) -> &Criterion<String> {
        &self.program
    }

    pub fn status(&self) -> &Criterion<String> {
        &self.status
    }

    /// Admission window in days.
    pub fn admitted_within(&self) -> &Criterion<u32> {
        &self.admitted_within
    }

    /// Sets the branch; a different branch resets the program.
    pub fn set_branch(&mut self, branch: Criterion<String>) {
        if branch != self.branch {
            self.program = Criterion::All;
        }
        self.branch = branch;
    }

    pub fn set_program(&mut self, program: Criterion<String>) {
        self.program = program;
    }

    pub fn set_status(&mut self, status: Criterion<String>) {
        self.status = status;
    }

    pub fn set_admitted_within(&mut self, days: Criterion<u32>) {
        self.admitted_within = days;
    }

    /// Sets the branch (builder pattern).
    pub fn with_branch(mut self, branch: impl Into<Criterion<String>>) -> Self {
        self.set_branch(branch.into());
        self
    }

    /// Sets the program (builder pattern).
    pub fn with_program(mut self, program: impl Into<Criterion<String>>) -> Self {
        self.set_program(program.into());
        self
    }

    /// Sets the status (builder pattern).
    pub fn with_status(mut self, status: impl Into<Criterion<String>>) -> Self {
        self.set_status(status.into());
        self
    }

    /// Sets the admission window (builder pattern).
    pub fn with_admitted_within(mut self, days: u32) -> Self {
        self.set_admitted_within(Criterion::Only(days));
        self
    }

    /// Returns a copy with one axis wildcarded and the others untouched.
    pub fn relax(&self, axis: Axis) -> Self {
        let mut relaxed = self.clone();
        match axis {
            Axis::Branch => relaxed.branch = Criterion::All,
            Axis::Program => relaxed.program = Criterion::All,
            Axis::Status => relaxed.status = Criterion::All,
            Axis::AdmittedWithin => relaxed.admitted_within = Criterion::All,
        }
        relaxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_branch_keeps_program() {
        let mut criteria = FilterCriteria::all().with_branch("b1").with_program("p1");
        criteria.set_branch("b1".into());
        assert_eq!(criteria.program(), &Criterion::Only("p1".to_string()));

        criteria.set_branch(Criterion::All);
        assert!(criteria.program().is_all());
    }

    #[test]
    fn test_relax_single_axis() {
        let criteria = FilterCriteria::all()
            .with_branch("b1")
            .with_program("p1")
            .with_status("active");
        let relaxed = criteria.relax(Axis::Branch);
        assert!(relaxed.branch().is_all());
        assert_eq!(relaxed.program(), &Criterion::Only("p1".to_string()));
        assert_eq!(relaxed.status(), &Criterion::Only("active".to_string()));
    }
}
