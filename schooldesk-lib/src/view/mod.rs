//! Table view logic
//!
//! The pure pipeline that turns a record snapshot into the rows a table
//! screen shows, plus selection tracking and bulk actions over it.
//!
//! - [`FilterEvaluator`] / [`filter_records`] - criteria and free-text search
//! - [`compare`] / [`sort_records`] - column sorting
//! - [`paginate`] - page slicing
//! - [`SelectionTracker`] - selection that survives filter changes
//! - [`BulkDispatcher`] - remote actions over the selection
//! - [`TableView`] - one screen's state, tying the above together

mod bulk;
mod columns;
mod criteria;
mod filter;
mod page;
mod schema;
mod selection;
mod sort;
mod table;

pub use bulk::BulkAction;
pub use bulk::BulkDispatcher;
pub use bulk::BulkKind;
pub use bulk::BulkOutcome;
pub use columns::ColumnDef;
pub use columns::Columns;
pub use criteria::Axis;
pub use criteria::Criterion;
pub use criteria::FilterCriteria;
pub use filter::FilterEvaluator;
pub use filter::filter_records;
pub use page::PageWindow;
pub use page::clamp_page;
pub use page::paginate;
pub use page::total_pages;
pub use schema::DerivedLabel;
pub use schema::ViewSchema;
pub use selection::ResolvedSelection;
pub use selection::Selection;
pub use selection::SelectionTracker;
pub use sort::Direction;
pub use sort::SortDescriptor;
pub use sort::compare;
pub use sort::sort_records;
pub use table::LoadState;
pub use table::TableView;
