//! Column definitions and visibility

use serde::Deserialize;
use serde::Serialize;

fn visible_by_default() -> bool {
    true
}

/// One table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Record field shown in the column.
    pub key: String,
    /// Header text.
    pub label: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            visible: true,
        }
    }

    /// Starts hidden (builder pattern).
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Ordered column list with per-column visibility.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Columns {
    columns: Vec<ColumnDef>,
}

impl Columns {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Flips visibility of a column. Returns `false` for an unknown key.
    pub fn toggle(&mut self, key: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.key == key) {
            Some(column) => {
                column.visible = !column.visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.key == key && c.visible)
    }

    /// Visible columns in display order.
    pub fn visible(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn visible_keys(&self) -> Vec<&str> {
        self.visible().map(|c| c.key.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }
}
