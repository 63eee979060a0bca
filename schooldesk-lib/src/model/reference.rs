//! Reference collections (branches, programs, ...)

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::Value;
use crate::error::FieldError;

/// Attribute that links a program to the branch offering it.
pub const BRANCH_ATTRIBUTE: &str = "branch_id";

/// The kind of lookup table a [`ReferenceCollection`] holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Branches,
    Programs,
    Other(String),
}

impl ReferenceKind {
    /// Returns the stable name used in cache keys and configuration.
    pub fn name(&self) -> &str {
        match self {
            Self::Branches => "branches",
            Self::Programs => "programs",
            Self::Other(name) => name,
        }
    }

    /// Parses a configuration name back into a kind.
    pub fn from_name(name: &str) -> Self {
        match name {
            "branches" => Self::Branches,
            "programs" => Self::Programs,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single lookup entry: an identifier, its display label and any extra
/// attributes the row carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Reference {
    /// Creates an entry without attributes.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute (builder pattern).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns an attribute rendered as text, if present and not null.
    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attributes
            .get(name)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
    }
}

/// Small, rarely-changing lookup table keyed by opaque string identifiers.
///
/// Fetched once per view session, cached, and replaced on explicit refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCollection {
    kind: ReferenceKind,
    entries: BTreeMap<String, Reference>,
}

impl ReferenceCollection {
    /// Creates an empty collection.
    pub fn new(kind: ReferenceKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Builds a collection from wire rows.
    ///
    /// Every column other than `id_field` and `label_field` is kept as an
    /// attribute.
    pub fn from_rows(
        kind: ReferenceKind,
        rows: impl IntoIterator<Item = serde_json::Value>,
        id_field: &str,
        label_field: &str,
    ) -> Result<Self, FieldError> {
        let mut collection = Self::new(kind);
        for row in rows {
            let record = super::Record::from_json(row, id_field)?;
            let label = record
                .non_null(label_field)
                .map(|v| v.to_string())
                .ok_or_else(|| FieldError::missing(label_field))?;
            let attributes = record
                .fields()
                .iter()
                .filter(|(key, _)| key.as_str() != id_field && key.as_str() != label_field)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            collection.insert(Reference {
                id: record.id().as_str().to_string(),
                label,
                attributes,
            });
        }
        Ok(collection)
    }

    /// Adds or replaces an entry (builder pattern).
    pub fn with(mut self, reference: Reference) -> Self {
        self.insert(reference);
        self
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, reference: Reference) {
        self.entries.insert(reference.id.clone(), reference);
    }

    /// Returns the collection kind.
    pub fn kind(&self) -> &ReferenceKind {
        &self.kind
    }

    /// Returns the entry for an identifier.
    pub fn get(&self, id: &str) -> Option<&Reference> {
        self.entries.get(id)
    }

    /// Returns the display label for an identifier.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|r| r.label.as_str())
    }

    /// Iterates entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.entries.values()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Program options valid under a branch choice.
    ///
    /// `None` means the branch filter is a wildcard and every entry is an
    /// option. Entries without a branch attribute only appear for the
    /// wildcard.
    pub fn programs_for_branch<'a>(
        &'a self,
        branch: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Reference> + 'a {
        self.entries.values().filter(move |r| match branch {
            None => true,
            Some(branch) => r.attribute_text(BRANCH_ATTRIBUTE).as_deref() == Some(branch),
        })
    }
}
