//! Cache keys

use std::fmt;

use crate::model::ReferenceKind;

/// Identifies one cached collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full record collection for a table (e.g. `students`).
    Records(String),
    /// A reference lookup table.
    Reference(ReferenceKind),
}

impl CacheKey {
    /// Key for a table's record collection.
    pub fn records(table: impl Into<String>) -> Self {
        Self::Records(table.into())
    }

    /// Key for a reference collection.
    pub fn reference(kind: ReferenceKind) -> Self {
        Self::Reference(kind)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records(table) => write!(f, "records:{}", table),
            Self::Reference(kind) => write!(f, "reference:{}", kind),
        }
    }
}
