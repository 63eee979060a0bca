//! Bulk action error types

/// Reasons a bulk action is refused before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkError {
    /// The selection resolved to no records.
    #[error("No records selected")]
    EmptySelection,

    /// The same action is still waiting for the backend.
    #[error("Bulk action '{action}' is already in flight")]
    InFlight { action: String },
}
