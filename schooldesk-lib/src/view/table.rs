//! The table view controller
//!
//! [`TableView`] holds the inputs of one table screen (snapshot, criteria,
//! search text, sort, page, selection) and recomputes every derived value
//! from them on demand:
//!
//! ```text
//! snapshot -> filter -> search -> sort -> paginate
//! ```
//!
//! Nothing derived is stored, so the view can never show a page that
//! disagrees with its inputs.

use chrono::DateTime;
use chrono::Utc;
use log::debug;
use log::warn;

use super::BulkAction;
use super::BulkDispatcher;
use super::BulkOutcome;
use super::Columns;
use super::Criterion;
use super::FilterCriteria;
use super::FilterEvaluator;
use super::PageWindow;
use super::SelectionTracker;
use super::SortDescriptor;
use super::ViewSchema;
use super::clamp_page;
use super::filter_records;
use super::paginate;
use super::sort_records;
use super::total_pages;
use crate::error::ConfigError;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::Reference;
use crate::model::ReferenceCollection;
use crate::model::ReferenceKind;
use crate::source::CachedSource;
use crate::source::FetchParams;

/// Where the snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing fetched yet.
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last fetch failed. Any earlier snapshot is still shown.
    Failed(String),
}

/// Inputs the derived pipeline reads.
#[derive(Debug, Clone)]
struct ViewState {
    records: Vec<Record>,
    branches: ReferenceCollection,
    programs: ReferenceCollection,
    criteria: FilterCriteria,
    search: String,
    sort: SortDescriptor,
    page: usize,
    page_size: usize,
    now: Option<DateTime<Utc>>,
}

impl ViewState {
    fn filtered<'a>(&'a self, schema: &'a ViewSchema) -> Vec<&'a Record> {
        let mut evaluator = FilterEvaluator::new(schema)
            .with_branches(&self.branches)
            .with_programs(&self.programs);
        if let Some(now) = self.now {
            evaluator = evaluator.at(now);
        }
        filter_records(&self.records, &self.criteria, &self.search, &evaluator)
    }
}

/// One table screen: students, teachers, payments, ...
///
/// # Example
///
/// ```ignore
/// let fixture = MemorySource::from_fixture(json, "id", 100)?;
/// let source = CachedSource::new(fixture, ViewCache::in_memory());
/// let mut view = TableView::new(ViewSchema::students(), source);
/// view.refresh().await?;
///
/// view.set_branch("b1".into());
/// view.set_search("amina");
/// for record in view.visible().items {
///     println!("{}", record.id());
/// }
/// ```
pub struct TableView {
    schema: ViewSchema,
    source: CachedSource,
    params: FetchParams,
    dispatcher: BulkDispatcher,
    state: ViewState,
    selection: SelectionTracker,
    columns: Columns,
    load_state: LoadState,
    mutation_error: Option<String>,
}

impl TableView {
    /// Creates an empty view over the schema's table.
    pub fn new(schema: ViewSchema, source: CachedSource) -> Self {
        let params = FetchParams::table(schema.table.clone());
        Self {
            dispatcher: BulkDispatcher::new(source.clone(), params.clone()),
            state: ViewState {
                records: Vec::new(),
                branches: ReferenceCollection::new(ReferenceKind::Branches),
                programs: ReferenceCollection::new(ReferenceKind::Programs),
                criteria: FilterCriteria::all(),
                search: String::new(),
                sort: schema.default_sort.clone(),
                page: 1,
                page_size: schema.page_size.max(1),
                now: None,
            },
            columns: Columns::new(schema.columns.clone()),
            selection: SelectionTracker::new(),
            load_state: LoadState::Idle,
            mutation_error: None,
            schema,
            source,
            params,
        }
    }

    /// Passes backend filter parameters with every fetch (builder pattern).
    pub fn with_params(mut self, params: FetchParams) -> Self {
        self.dispatcher = BulkDispatcher::new(self.source.clone(), params.clone());
        self.params = params;
        self
    }

    /// Measures date windows from a fixed instant instead of the clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.state.now = Some(now);
        self
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads records, branches and programs concurrently.
    ///
    /// The snapshot is replaced only when all three succeed. On failure the
    /// previous snapshot stays in place and the view enters
    /// [`LoadState::Failed`].
    pub async fn refresh(&mut self) -> Result<(), Error> {
        self.load_state = LoadState::Loading;
        let fetched = futures::try_join!(
            self.source.records(&self.params),
            self.source.reference(&ReferenceKind::Branches),
            self.source.reference(&ReferenceKind::Programs),
        );

        match fetched {
            Ok((records, branches, programs)) => {
                debug!(
                    "{}: {} records (cached: {})",
                    self.schema.table,
                    records.data().len(),
                    records.is_cached()
                );
                let mut records = records.into_inner();
                for record in &mut records {
                    self.schema.enrich(record);
                }
                self.state.records = records;
                self.state.branches = branches.into_inner();
                self.state.programs = programs.into_inner();
                self.state.page = clamp_page(
                    self.state.page,
                    self.state.filtered(&self.schema).len(),
                    self.state.page_size,
                );
                self.load_state = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("{}: refresh failed: {}", self.schema.table, e);
                self.load_state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Drops the cached records and fetches them again.
    pub async fn reload(&mut self) -> Result<(), Error> {
        let swept = self.source.cache().gc().await;
        if swept > 0 {
            debug!("swept {} expired cache entries", swept);
        }
        self.source.invalidate_records(&self.params).await;
        self.refresh().await
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// Error of the last failed bulk action, cleared by the next success.
    pub fn mutation_error(&self) -> Option<&str> {
        self.mutation_error.as_deref()
    }

    pub fn dismiss_mutation_error(&mut self) {
        self.mutation_error = None;
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    pub fn schema(&self) -> &ViewSchema {
        &self.schema
    }

    /// The whole snapshot, unfiltered.
    pub fn records(&self) -> &[Record] {
        &self.state.records
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.state.criteria
    }

    pub fn search(&self) -> &str {
        &self.state.search
    }

    pub fn sort(&self) -> &SortDescriptor {
        &self.state.sort
    }

    pub fn page(&self) -> usize {
        self.state.page
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn branches(&self) -> &ReferenceCollection {
        &self.state.branches
    }

    /// Program choices valid under the selected branch.
    pub fn program_options(&self) -> Vec<&Reference> {
        let branch = self.state.criteria.branch().value().map(String::as_str);
        self.state.programs.programs_for_branch(branch).collect()
    }

    /// Sets the branch. A different branch also resets the program.
    pub fn set_branch(&mut self, branch: Criterion<String>) {
        self.state.criteria.set_branch(branch);
        self.state.page = 1;
    }

    pub fn set_program(&mut self, program: Criterion<String>) {
        self.state.criteria.set_program(program);
        self.state.page = 1;
    }

    pub fn set_status(&mut self, status: Criterion<String>) {
        self.state.criteria.set_status(status);
        self.state.page = 1;
    }

    pub fn set_admitted_within(&mut self, days: Criterion<u32>) {
        self.state.criteria.set_admitted_within(days);
        self.state.page = 1;
    }

    /// Replaces every criterion at once.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.state.criteria = criteria;
        self.state.page = 1;
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.state.search = query.into();
        self.state.page = 1;
    }

    /// Sorts by a column, flipping direction if it is already active.
    pub fn toggle_sort(&mut self, column: &str) {
        self.state.sort.toggle(column);
    }

    pub fn set_sort(&mut self, sort: SortDescriptor) {
        self.state.sort = sort;
    }

    /// Moves to a page, clamped to the pages that exist.
    pub fn set_page(&mut self, page: usize) {
        self.state.page = clamp_page(page, self.filtered().len(), self.state.page_size);
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        self.state.page_size = page_size;
        self.state.page = 1;
        Ok(())
    }

    pub fn toggle_column(&mut self, key: &str) -> bool {
        self.columns.toggle(key)
    }

    // =========================================================================
    // Derived
    // =========================================================================

    /// Records passing the criteria and search, in snapshot order.
    pub fn filtered(&self) -> Vec<&Record> {
        self.state.filtered(&self.schema)
    }

    /// Filtered records in sort order.
    pub fn sorted(&self) -> Vec<&Record> {
        let mut records = self.filtered();
        sort_records(&mut records, &self.state.sort, &self.schema.sort_aliases);
        records
    }

    /// The current page of sorted records.
    pub fn visible(&self) -> PageWindow<&Record> {
        paginate(&self.sorted(), self.state.page, self.state.page_size)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered().len(), self.state.page_size)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn toggle_selection(&mut self, id: &RecordId) {
        let filtered = self.state.filtered(&self.schema);
        self.selection.toggle(id, &filtered);
    }

    /// Selects every filtered record, or clears when all are selected.
    pub fn select_all(&mut self) {
        let filtered = self.state.filtered(&self.schema);
        self.selection.select_all_visible(&filtered);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selection.is_selected(id, &self.filtered())
    }

    /// Selected records present in the filtered view.
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.selection.resolve(&self.filtered()).ids
    }

    pub fn selected_count(&self) -> usize {
        self.selection.resolve(&self.filtered()).len()
    }

    /// Bulk controls are disabled while nothing is selected.
    pub fn bulk_enabled(&self) -> bool {
        self.selected_count() > 0
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Sets the status field of every selected record.
    pub fn mark_action(&self, status: &str) -> BulkAction {
        BulkAction::mark(
            self.schema.table.clone(),
            self.schema.status_function.clone(),
            self.schema.status_field.clone(),
            status,
        )
    }

    /// Deletes every selected record.
    pub fn delete_action(&self) -> BulkAction {
        BulkAction::delete(self.schema.table.clone(), self.schema.delete_function.clone())
    }

    /// Applies an action to the selection and refetches on success.
    ///
    /// A remote failure is kept in [`mutation_error`](Self::mutation_error)
    /// and leaves the snapshot and selection untouched.
    pub async fn apply_bulk(&mut self, action: &BulkAction) -> Result<BulkOutcome, Error> {
        let result = {
            let filtered = self.state.filtered(&self.schema);
            self.dispatcher
                .apply(action, &mut self.selection, &filtered)
                .await
        };
        self.settle(result).await
    }

    /// Deletes one row regardless of the selection.
    pub async fn delete_row(&mut self, id: &RecordId) -> Result<BulkOutcome, Error> {
        let action = self.delete_action();
        let result = {
            let filtered = self.state.filtered(&self.schema);
            let mut single = SelectionTracker::new();
            single.toggle(id, &filtered);
            self.dispatcher.apply(&action, &mut single, &filtered).await
        };
        if result.is_ok() {
            self.selection.forget(id);
        }
        self.settle(result).await
    }

    async fn settle(&mut self, result: Result<BulkOutcome, Error>) -> Result<BulkOutcome, Error> {
        match result {
            Ok(outcome) => {
                self.mutation_error = None;
                // A failed refetch is reported through the load state.
                let _ = self.refresh().await;
                Ok(outcome)
            }
            Err(e @ Error::Bulk(_)) => Err(e),
            Err(e) => {
                self.mutation_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ViewCache;
    use crate::source::MemorySource;

    fn view() -> TableView {
        let records = (1..=12i64)
            .map(|n| {
                Record::new(n)
                    .set("id", n)
                    .set("first_name", format!("Student {:02}", n))
                    .set("branch_id", if n % 2 == 0 { "A" } else { "B" })
                    .set("status", "active")
            })
            .collect();
        let source = MemorySource::new(5).with_table("students", records);
        TableView::new(
            ViewSchema::students(),
            CachedSource::new(source, ViewCache::in_memory()),
        )
    }

    #[tokio::test]
    async fn test_refresh_loads_snapshot() {
        let mut view = view();
        assert_eq!(view.load_state(), &LoadState::Idle);
        view.refresh().await.unwrap();
        assert_eq!(view.load_state(), &LoadState::Ready);
        assert_eq!(view.records().len(), 12);
        assert_eq!(view.total_pages(), 2);
        assert_eq!(view.visible().items.len(), 10);
    }

    #[tokio::test]
    async fn test_filter_changes_reset_page() {
        let mut view = view();
        view.refresh().await.unwrap();
        view.set_page(2);
        assert_eq!(view.page(), 2);

        view.set_branch("A".into());
        assert_eq!(view.page(), 1);
        assert_eq!(view.filtered().len(), 6);

        view.set_page(9);
        assert_eq!(view.page(), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let mut view = view();
        assert!(view.set_page_size(0).is_err());
        assert_eq!(view.page_size(), 10);
    }

    #[tokio::test]
    async fn test_bulk_mark_refetches() {
        let mut view = view();
        view.refresh().await.unwrap();
        assert!(!view.bulk_enabled());

        view.set_branch("A".into());
        view.select_all();
        assert_eq!(view.selected_count(), 6);

        let action = view.mark_action("inactive");
        let outcome = view.apply_bulk(&action).await.unwrap();
        assert_eq!(outcome.affected(), 6);
        assert_eq!(view.selected_count(), 0);
        assert_eq!(view.mutation_error(), None);

        view.set_status("inactive".into());
        assert_eq!(view.filtered().len(), 6);
    }

    #[tokio::test]
    async fn test_delete_row_keeps_other_selection() {
        let mut view = view();
        view.refresh().await.unwrap();
        view.toggle_selection(&RecordId::from(1i64));
        view.toggle_selection(&RecordId::from(2i64));

        view.delete_row(&RecordId::from(2i64)).await.unwrap();
        assert_eq!(view.records().len(), 11);
        assert_eq!(view.selected_ids(), vec![RecordId::from(1i64)]);
    }
}
